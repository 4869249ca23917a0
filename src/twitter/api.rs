//! Core Twitter API access.
//!
//! [`SocialApi`] is the seam between the bot and the remote service: one
//! method per remote operation, each returning the raw outcome of a single
//! attempt. Retrying and error classification live in
//! [`ResilientClient`](super::ResilientClient). [`TwitterApi`] is the
//! production implementation over the Twitter/X API v2.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::config::TwitterConfig;
use crate::oauth::build_oauth2_user_context_header;

use super::model::{Mention, Post};
use super::parsing::{parse_created_tweet_id, parse_mentions, parse_posts};

const API_BASE: &str = "https://api.x.com/2";

/// The failure of a single API attempt.
#[derive(Debug, Error)]
pub enum CallError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {code}")]
    Status { code: u16, body: String },
    /// The request never produced a usable response (connection failure,
    /// unreadable body, malformed JSON).
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        CallError::Transport(e.to_string())
    }
}

/// Remote operations the bot needs from the social media service.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// One page of a user's timeline, newest first, containing only tweets
    /// with an id less than or equal to `max_id` when given.
    async fn fetch_user_posts(
        &self,
        username: &str,
        max_id: Option<u64>,
        page_size: usize,
    ) -> Result<Vec<Post>, CallError>;

    /// Mentions of the bot newer than `since_id`, newest first.
    async fn fetch_mentions(&self, since_id: Option<&str>) -> Result<Vec<Mention>, CallError>;

    /// Posts `text` as a reply to tweet `in_reply_to`, returning the new tweet's id.
    async fn post_reply(&self, text: &str, in_reply_to: &str)
        -> Result<Option<String>, CallError>;
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// Newlines, carriage returns and tabs become spaces, other control
/// characters become `?`, and text longer than `max_chars` characters is
/// truncated on a character boundary.
pub(crate) fn sanitize_for_logging(text: &str, max_chars: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    let total = sanitized.chars().count();
    if total > max_chars {
        let truncated: String = sanitized.chars().take(max_chars).collect();
        format!("{}... [truncated, {} total chars]", truncated, total)
    } else {
        sanitized
    }
}

/// Twitter/X API v2 client authenticated with an OAuth 2.0 user context token.
pub struct TwitterApi {
    client: Client,
    config: TwitterConfig,
    bot_name: String,
    /// Username → user id, filled lazily
    user_ids: Mutex<HashMap<String, String>>,
}

impl TwitterApi {
    pub fn new(config: TwitterConfig, bot_name: &str) -> Self {
        TwitterApi {
            client: Client::new(),
            config,
            bot_name: bot_name.to_string(),
            user_ids: Mutex::new(HashMap::new()),
        }
    }

    fn auth_header(&self) -> String {
        build_oauth2_user_context_header(&self.config.access_token)
    }

    /// Sends one request and decodes its JSON body.
    ///
    /// Non-success statuses become [`CallError::Status`]; network failures and
    /// undecodable bodies become [`CallError::Transport`].
    async fn send(
        &self,
        request_builder: reqwest::RequestBuilder,
        operation_name: &str,
    ) -> Result<serde_json::Value, CallError> {
        debug!("Sending request for operation: {}", operation_name);

        let response = request_builder.send().await?;
        let status = response.status();
        debug!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        let body = response.text().await?;

        if !status.is_success() {
            error!("Operation '{}' failed - Status: {}", operation_name, status);
            debug!(
                "Error response for '{}': {}",
                operation_name,
                sanitize_for_logging(&body, 200)
            );
            return Err(CallError::Status {
                code: status.as_u16(),
                body,
            });
        }

        debug!(
            "Response summary for '{}': {} bytes received",
            operation_name,
            body.len()
        );
        serde_json::from_str(&body).map_err(|e| {
            CallError::Transport(format!(
                "malformed response for '{}': {}",
                operation_name, e
            ))
        })
    }

    /// Looks up a user id by username, using the cache when possible.
    ///
    /// A lookup that succeeds but names no user is reported as a 404, the
    /// same as the v1 API did for unknown screen names.
    async fn lookup_user_id(&self, username: &str) -> Result<String, CallError> {
        let key = username.to_lowercase();
        if let Some(id) = self.cached_user_id(&key) {
            return Ok(id);
        }

        info!("Looking up user by username: {}", username);
        let url = format!(
            "{}/users/by/username/{}",
            API_BASE,
            urlencoding::encode(username)
        );
        let request_builder = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header());
        let json_response = self.send(request_builder, "lookup_user").await?;

        match json_response
            .get("data")
            .and_then(|d| d.get("id"))
            .and_then(|v| v.as_str())
        {
            Some(id) => {
                info!("Found user @{} with id {}", username, id);
                if let Ok(mut cache) = self.user_ids.lock() {
                    cache.insert(key, id.to_string());
                }
                Ok(id.to_string())
            }
            None => Err(CallError::Status {
                code: 404,
                body: format!("user @{} not found", username),
            }),
        }
    }

    fn cached_user_id(&self, key: &str) -> Option<String> {
        self.user_ids
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }
}

#[async_trait]
impl SocialApi for TwitterApi {
    async fn fetch_user_posts(
        &self,
        username: &str,
        max_id: Option<u64>,
        page_size: usize,
    ) -> Result<Vec<Post>, CallError> {
        let user_id = self.lookup_user_id(username).await?;

        // The v2 endpoint accepts 5..=100 results per page
        let mut url = format!(
            "{}/users/{}/tweets?max_results={}&tweet.fields=lang,created_at",
            API_BASE,
            user_id,
            page_size.clamp(5, 100)
        );
        // until_id is exclusive, max_id is inclusive
        if let Some(max_id) = max_id {
            url.push_str(&format!("&until_id={}", max_id.saturating_add(1)));
        }

        debug!("Timeline URL: {}", url);
        let request_builder = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header());
        let json_response = self.send(request_builder, "fetch_user_posts").await?;

        Ok(parse_posts(&json_response))
    }

    async fn fetch_mentions(&self, since_id: Option<&str>) -> Result<Vec<Mention>, CallError> {
        let bot_id = self.lookup_user_id(&self.bot_name).await?;

        let mut url = format!(
            "{}/users/{}/mentions?max_results=100&expansions=author_id&user.fields=username&tweet.fields=lang,entities,created_at,author_id",
            API_BASE, bot_id
        );
        if let Some(since_id) = since_id {
            url.push_str(&format!("&since_id={}", urlencoding::encode(since_id)));
        }

        debug!("Mentions URL: {}", url);
        let request_builder = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header());
        let json_response = self.send(request_builder, "fetch_mentions").await?;

        Ok(parse_mentions(&json_response))
    }

    async fn post_reply(
        &self,
        text: &str,
        in_reply_to: &str,
    ) -> Result<Option<String>, CallError> {
        info!(
            "Replying to tweet {} with text: '{}'",
            in_reply_to,
            sanitize_for_logging(text, 280)
        );

        let payload = json!({
            "text": text,
            "reply": {
                "in_reply_to_tweet_id": in_reply_to
            }
        });
        debug!("Request headers: Authorization: Bearer [REDACTED], Content-Type: application/json");

        let request_builder = self
            .client
            .post(format!("{}/tweets", API_BASE))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&payload);
        let json_response = self.send(request_builder, "post_reply").await?;

        Ok(parse_created_tweet_id(&json_response))
    }
}
