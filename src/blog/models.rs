//! Blog post models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of `POST /blog/send_post`
#[derive(Deserialize, Debug, Clone)]
pub struct BlogPostRequest {
    pub title: String,
    pub post: String,
}

/// One entry of the post log. Never edited or removed once appended.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub user_id: String,
    pub email: String,
    pub title: String,
    pub post: String,
}

/// Rule deciding which records belong to the caller when listing posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdMatch {
    /// A record matches when its `user_id` occurs anywhere inside the caller's
    /// id. An empty record id, or a record id that is a substring of the
    /// caller's, also matches.
    Contains,
    /// A record matches only when the ids are equal
    Exact,
}

impl UserIdMatch {
    pub fn matches(&self, record_user_id: &str, caller_user_id: &str) -> bool {
        match self {
            UserIdMatch::Contains => caller_user_id.contains(record_user_id),
            UserIdMatch::Exact => record_user_id == caller_user_id,
        }
    }
}

impl FromStr for UserIdMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" => Ok(UserIdMatch::Contains),
            "exact" => Ok(UserIdMatch::Exact),
            other => Err(format!(
                "unknown matching rule '{}', expected 'contains' or 'exact'",
                other
            )),
        }
    }
}

impl fmt::Display for UserIdMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserIdMatch::Contains => write!(f, "contains"),
            UserIdMatch::Exact => write!(f, "exact"),
        }
    }
}
