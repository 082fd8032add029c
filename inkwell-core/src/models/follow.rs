use chrono::{DateTime, Utc};
use serde::Serialize;

use super::post::AuthorInfo;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Follow {
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// One row of a followers or following list.
#[derive(Debug, Clone, Serialize)]
pub struct FollowEntry {
    pub user: AuthorInfo,
    pub since: DateTime<Utc>,
}
