//! Database row types that never leave the storage/auth boundary.
//! Everything else is returned as circulo-types models.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Fixed-width RFC 3339 with microseconds, so text comparison in SQL is
/// chronological comparison.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
