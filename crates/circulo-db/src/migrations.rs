use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE profiles (
                user_id       TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                full_name     TEXT NOT NULL DEFAULT '',
                birth_date    TEXT,
                location      TEXT NOT NULL DEFAULT '',
                bio           TEXT NOT NULL DEFAULT '',
                email         TEXT NOT NULL DEFAULT '',
                phone_number  TEXT,
                education     TEXT
            );

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                edited_at   TEXT
            );

            CREATE INDEX idx_comments_user
                ON comments(user_id, created_at);

            -- Self-follow is refused here as well as in Database::follow.
            CREATE TABLE follows (
                follower_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followed_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at   TEXT NOT NULL,
                PRIMARY KEY (follower_id, followed_id),
                CHECK (follower_id <> followed_id)
            );

            CREATE INDEX idx_follows_followed
                ON follows(followed_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
