use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-text profile attached 1:1 to a user. Created empty at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub location: String,
    pub bio: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub education: Option<String>,
}

/// A comment together with its author's username.
///
/// `edited_at` stays `None` until the author changes the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Directed edge: `follower_id` follows `followed_id` since `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One row of the following/followers lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEntry {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Nothing was written.
    SelfFollow,
}

/// Result of the author-scoped comment mutations. `NotFound` covers both a
/// missing id and a comment owned by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentChange {
    Applied,
    NotFound,
}
