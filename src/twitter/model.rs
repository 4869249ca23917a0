//! Data carried between the Twitter client, the mention queue and the pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An inbound post that references the bot.
///
/// Immutable once fetched. Serialized as part of the persisted queue snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Tweet ID, a numeric string
    pub id: String,
    /// Username of the author, without the leading @
    pub author: String,
    pub text: String,
    /// Hashtags as they appear in the tweet, without the leading #
    pub hashtags: Vec<String>,
    /// Usernames referenced in the tweet, in order of appearance
    pub mentioned_users: Vec<String>,
    /// Declared language, if the API determined one
    pub lang: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A tweet from a user's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub text: String,
    pub lang: Option<String>,
}

/// Orders tweet IDs the way the API does.
///
/// IDs are numeric strings of varying length, so a shorter ID is always
/// older; equal-length IDs compare lexicographically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Returns `true` if tweet `a` is strictly newer than tweet `b`.
pub fn is_newer(a: &str, b: &str) -> bool {
    compare_ids(a, b) == Ordering::Greater
}
