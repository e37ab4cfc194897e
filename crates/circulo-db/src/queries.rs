use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use circulo_types::forms::ProfileUpdate;
use circulo_types::models::{
    Comment, CommentChange, Follow, FollowCounts, FollowEntry, FollowOutcome, Profile,
};

use crate::Database;
use crate::models::{UserRow, format_timestamp, parse_timestamp};

const COMMENT_SELECT: &str = "SELECT c.id, c.user_id, u.username, c.content, c.created_at, c.edited_at
     FROM comments c
     JOIN users u ON u.id = c.user_id";

impl Database {
    // -- Users --

    /// Creates the user and its empty profile in one transaction.
    pub fn create_account(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), username, password_hash, format_timestamp(at)],
            )?;
            tx.execute(
                "INSERT INTO profiles (user_id) VALUES (?1)",
                [id.to_string()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    #[cfg(test)]
    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.user_id, u.username, p.full_name, p.birth_date, p.location, p.bio,
                        p.email, p.phone_number, p.education
                 FROM profiles p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.user_id = ?1",
            )?;
            stmt.query_row([user_id.to_string()], |row| {
                Ok(Profile {
                    user_id: uuid_col(row, 0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    birth_date: date_col(row, 3)?,
                    location: row.get(4)?,
                    bio: row.get(5)?,
                    email: row.get(6)?,
                    phone_number: row.get(7)?,
                    education: row.get(8)?,
                })
            })
            .optional()
        })
    }

    /// Replaces every profile field. Returns false when the user has no profile.
    pub fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles
                 SET full_name = ?2, birth_date = ?3, location = ?4, bio = ?5,
                     email = ?6, phone_number = ?7, education = ?8
                 WHERE user_id = ?1",
                params![
                    user_id.to_string(),
                    update.full_name,
                    update.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    update.location,
                    update.bio,
                    update.email,
                    update.phone_number,
                    update.education,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, author_id: Uuid, content: &str, at: DateTime<Utc>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (user_id, content, created_at) VALUES (?1, ?2, ?3)",
                params![author_id.to_string(), content, format_timestamp(at)],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Fetches a comment only if `author_id` wrote it.
    pub fn get_own_comment(&self, id: i64, author_id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT} WHERE c.id = ?1 AND c.user_id = ?2");
            conn.query_row(&sql, params![id, author_id.to_string()], comment_from_row)
                .optional()
        })
    }

    pub fn update_comment(
        &self,
        id: i64,
        author_id: Uuid,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<CommentChange> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?3, edited_at = ?4 WHERE id = ?1 AND user_id = ?2",
                params![id, author_id.to_string(), content, format_timestamp(at)],
            )?;
            Ok(change(changed))
        })
    }

    pub fn delete_comment(&self, id: i64, author_id: Uuid) -> Result<CommentChange> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
                params![id, author_id.to_string()],
            )?;
            Ok(change(changed))
        })
    }

    /// Newest first.
    pub fn comments_by_author(&self, author_id: Uuid, limit: u32) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.user_id = ?1 ORDER BY c.created_at DESC, c.id DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![author_id.to_string(), limit], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    pub fn follow(&self, follower_id: Uuid, followed_id: Uuid, at: DateTime<Utc>) -> Result<FollowOutcome> {
        if follower_id == followed_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (follower_id, followed_id) DO NOTHING",
                params![follower_id.to_string(), followed_id.to_string(), format_timestamp(at)],
            )?;
            Ok(if inserted == 1 {
                FollowOutcome::Created
            } else {
                FollowOutcome::AlreadyFollowing
            })
        })
    }

    /// Returns whether an edge was removed.
    pub fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                params![follower_id.to_string(), followed_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn get_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<Option<Follow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT follower_id, followed_id, created_at FROM follows
                 WHERE follower_id = ?1 AND followed_id = ?2",
                params![follower_id.to_string(), followed_id.to_string()],
                |row| {
                    Ok(Follow {
                        follower_id: uuid_col(row, 0)?,
                        followed_id: uuid_col(row, 1)?,
                        created_at: ts_col(row, 2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Users `user_id` follows, most recent follow first.
    pub fn following(&self, user_id: Uuid) -> Result<Vec<FollowEntry>> {
        self.with_conn(|conn| {
            query_follow_entries(
                conn,
                "SELECT u.id, u.username, COALESCE(p.full_name, ''), f.created_at
                 FROM follows f
                 JOIN users u ON u.id = f.followed_id
                 LEFT JOIN profiles p ON p.user_id = u.id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC",
                user_id,
            )
        })
    }

    /// Users following `user_id`, most recent follow first.
    pub fn followers(&self, user_id: Uuid) -> Result<Vec<FollowEntry>> {
        self.with_conn(|conn| {
            query_follow_entries(
                conn,
                "SELECT u.id, u.username, COALESCE(p.full_name, ''), f.created_at
                 FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 LEFT JOIN profiles p ON p.user_id = u.id
                 WHERE f.followed_id = ?1
                 ORDER BY f.created_at DESC",
                user_id,
            )
        })
    }

    pub fn follow_counts(&self, user_id: Uuid) -> Result<FollowCounts> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE followed_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1)",
                [user_id.to_string()],
                |row| {
                    Ok(FollowCounts {
                        followers: row.get(0)?,
                        following: row.get(1)?,
                    })
                },
            )?;
            Ok(counts)
        })
    }

    // -- Feed --

    /// Comments by authors `viewer_id` follows, keeping only those created at or
    /// after the moment the follow edge was created. Newest first.
    pub fn feed(&self, viewer_id: Uuid, limit: u32) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, u.username, c.content, c.created_at, c.edited_at
                 FROM comments c
                 JOIN follows f
                   ON f.followed_id = c.user_id
                  AND f.follower_id = ?1
                  AND c.created_at >= f.created_at
                 JOIN users u ON u.id = c.user_id
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![viewer_id.to_string(), limit], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn change(rows: usize) -> CommentChange {
    if rows == 0 {
        CommentChange::NotFound
    } else {
        CommentChange::Applied
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: uuid_col(row, 0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            created_at: ts_col(row, 3)?,
        })
    })
    .optional()
}

fn query_follow_entries(conn: &Connection, sql: &str, user_id: Uuid) -> Result<Vec<FollowEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(FollowEntry {
                user_id: uuid_col(row, 0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                since: ts_col(row, 3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        author_id: uuid_col(row, 1)?,
        author_username: row.get(2)?,
        content: row.get(3)?,
        created_at: ts_col(row, 4)?,
        edited_at: opt_ts_col(row, 5)?,
    })
}

// -- Column decoding --

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
