//! Parsing of Twitter API v2 JSON responses into [`Mention`] and [`Post`] values.

use log::{debug, warn};
use std::collections::HashMap;

use super::api::sanitize_for_logging;
use super::model::{Mention, Post};

/// The language tag the API uses when it could not determine one.
const UNDETERMINED_LANG: &str = "und";

fn declared_lang(tweet: &serde_json::Value) -> Option<String> {
    tweet
        .get("lang")
        .and_then(|v| v.as_str())
        .filter(|lang| !lang.is_empty() && *lang != UNDETERMINED_LANG)
        .map(str::to_string)
}

fn entity_values(tweet: &serde_json::Value, kind: &str, field: &str) -> Vec<String> {
    tweet
        .get("entities")
        .and_then(|e| e.get(kind))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts the tweets of a `/2/users/:id/tweets` page, in response order (newest first).
///
/// Tweets without a numeric `id` or without `text` are skipped.
pub(crate) fn parse_posts(json_response: &serde_json::Value) -> Vec<Post> {
    let Some(tweets) = json_response.get("data").and_then(|d| d.as_array()) else {
        debug!("Timeline page has no data");
        return Vec::new();
    };

    tweets
        .iter()
        .filter_map(|tweet| {
            let id = tweet
                .get("id")
                .and_then(|v| v.as_str())
                .and_then(|id| id.parse::<u64>().ok());
            let text = tweet.get("text").and_then(|v| v.as_str());
            match (id, text) {
                (Some(id), Some(text)) => Some(Post {
                    id,
                    text: text.to_string(),
                    lang: declared_lang(tweet),
                }),
                _ => {
                    warn!("Skipping malformed timeline entry: {}", tweet);
                    None
                }
            }
        })
        .collect()
}

/// Extracts the mentions of a `/2/users/:id/mentions` response, in response order (newest first).
///
/// Author usernames are resolved through the `includes.users` expansion.
pub(crate) fn parse_mentions(json_response: &serde_json::Value) -> Vec<Mention> {
    // Create a map of user ID to username for quick lookup
    let mut users_username_map = HashMap::new();
    if let Some(users) = json_response
        .get("includes")
        .and_then(|i| i.get("users"))
        .and_then(|u| u.as_array())
    {
        for user in users {
            if let (Some(id), Some(username)) = (
                user.get("id").and_then(|v| v.as_str()),
                user.get("username").and_then(|v| v.as_str()),
            ) {
                users_username_map.insert(id.to_string(), username.to_string());
            }
        }
    }

    let Some(tweets) = json_response.get("data").and_then(|d| d.as_array()) else {
        return Vec::new();
    };

    let mut mentions = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        let (Some(id), Some(text), Some(author_id)) = (
            tweet.get("id").and_then(|v| v.as_str()),
            tweet.get("text").and_then(|v| v.as_str()),
            tweet.get("author_id").and_then(|v| v.as_str()),
        ) else {
            warn!("Skipping malformed mention: {}", tweet);
            continue;
        };

        let Some(author) = users_username_map.get(author_id) else {
            warn!(
                "Skipping mention {} - author {} missing from includes",
                id, author_id
            );
            continue;
        };

        let created_at = tweet
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));

        debug!(
            "Mention {} by @{}: {}",
            id,
            author,
            sanitize_for_logging(text, 140)
        );

        mentions.push(Mention {
            id: id.to_string(),
            author: author.clone(),
            text: text.to_string(),
            hashtags: entity_values(tweet, "hashtags", "tag"),
            mentioned_users: entity_values(tweet, "mentions", "username"),
            lang: declared_lang(tweet),
            created_at,
        });
    }

    mentions
}

/// Reads the id of a newly created tweet from a `POST /2/tweets` response.
pub(crate) fn parse_created_tweet_id(json_response: &serde_json::Value) -> Option<String> {
    json_response
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
