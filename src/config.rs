//! Configuration module for the tweetcloud bot.
//!
//! This module contains configuration structures and environment variable handling
//! for the Twitter/X API, the Imgur upload API and the word cloud pipeline.
//! Settings are read once at startup and never change afterwards.

use log::{debug, error, info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Credentials for the Twitter/X API v2 endpoints.
///
/// The bot uses OAuth 2.0 User Context (Access Token) for all operations:
/// reading timelines, reading mentions and posting replies. Obtaining the
/// token is outside the scope of the bot.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// The Access Token for OAuth 2.0 User Context authentication
    pub access_token: String,
}

/// Credentials for the Imgur API.
#[derive(Debug, Clone)]
pub struct ImgurConfig {
    /// Client ID of the registered Imgur application
    pub client_id: String,
    /// Access token of the Imgur account; anonymous uploads are used when absent
    pub access_token: Option<String>,
}

/// Everything the bot needs to run, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub twitter: TwitterConfig,
    pub imgur: ImgurConfig,
    /// Username of the bot account, without the leading @
    pub bot_name: String,
    /// Hashtags (lowercase, without #) that trigger a word cloud
    pub hashtags: Vec<String>,
    /// Maximum number of words drawn in the image
    pub max_words: usize,
    pub width: u32,
    pub height: u32,
    /// Maximum number of tweets sampled from the target's timeline
    pub max_results: usize,
    /// Directory where rendered images are written
    pub output_dir: PathBuf,
    /// Directory holding the queue snapshot and the watermark
    pub state_dir: PathBuf,
    /// Boilerplate appended to the uploaded image description
    pub image_description: String,
    /// Directory of `stopwords-<lang>.txt` files replacing the built-in lists
    pub stopwords_dir: Option<PathBuf>,
    /// External word cloud renderer executable
    pub render_command: String,
    /// Idle time between two mention drain cycles
    pub poll_interval: Duration,
    /// Pause after each posted reply
    pub reply_pause: Duration,
    /// Replies longer than this (in characters) are not posted
    pub max_reply_length: usize,
}

/// Masks a secret for logging, keeping at most 8 leading and 8 trailing characters.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();

    let prefix: String = chars.iter().take(8.min(len)).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Some(_) => {
            error!("{} is set but empty", key);
            Err(format!("{} cannot be empty", key).into())
        }
        None => {
            error!("Make sure the {} environment variable is set", key);
            Err(format!("Missing {} environment variable", key).into())
        }
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_or<F, T>(
    lookup: &F,
    key: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match optional(lookup, key) {
        Some(raw) => raw.parse::<T>().map_err(|_| -> Box<dyn std::error::Error + Send + Sync> {
            error!("{} has an invalid value: '{}'", key, raw);
            format!("{} must be a valid number, got '{}'", key, raw).into()
        }),
        None => {
            debug!("{} not set, using default {}", key, default);
            Ok(default)
        }
    }
}

fn parse_hashtags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().trim_start_matches('#').to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

impl BotConfig {
    /// Loads the configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `xapi_access_token`: Twitter API Access Token (OAuth 2.0 User Context)
    /// - `imgur_client_id`: Imgur application Client ID
    /// - `BOT_NAME`: username of the bot account
    ///
    /// # Optional Environment Variables
    ///
    /// - `imgur_access_token`: upload to the Imgur account instead of anonymously
    /// - `WORDCLOUD_HASHTAGS`: comma separated trigger hashtags (default `wordcloud`)
    /// - `MAX_WORDS` (200), `IMAGE_WIDTH` (1024), `IMAGE_HEIGHT` (512), `MAX_RESULTS` (1000)
    /// - `OUTPUT_DIR` (`output`), `STATE_DIR` (`state`), `STOPWORDS_DIR`
    /// - `IMAGE_DESCRIPTION`, `RENDER_COMMAND` (`wordcloud_cli`)
    /// - `POLL_INTERVAL_SECS` (300), `REPLY_PAUSE_SECS` (30), `MAX_REPLY_LENGTH` (140)
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tweetcloud::BotConfig;
    ///
    /// let config = BotConfig::from_env().expect("configuration");
    /// println!("Running as @{}", config.bot_name);
    /// ```
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading bot configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_token = required(&lookup, "xapi_access_token")?;
        debug!("Access token (masked): {}", mask_secret(&access_token));
        if access_token.len() < 10 {
            warn!(
                "Access token seems unusually short ({} characters)",
                access_token.len()
            );
        }

        let client_id = required(&lookup, "imgur_client_id")?;
        debug!("Imgur client ID (masked): {}", mask_secret(&client_id));
        let imgur_access_token = optional(&lookup, "imgur_access_token");
        if imgur_access_token.is_none() {
            info!("No imgur_access_token found - images will be uploaded anonymously");
        }

        let bot_name = required(&lookup, "BOT_NAME")?
            .trim_start_matches('@')
            .to_string();

        let hashtags = parse_hashtags(
            &optional(&lookup, "WORDCLOUD_HASHTAGS").unwrap_or_else(|| "wordcloud".to_string()),
        );
        if hashtags.is_empty() {
            return Err("WORDCLOUD_HASHTAGS must name at least one hashtag".into());
        }

        let config = BotConfig {
            twitter: TwitterConfig { access_token },
            imgur: ImgurConfig {
                client_id,
                access_token: imgur_access_token,
            },
            bot_name,
            hashtags,
            max_words: parsed_or(&lookup, "MAX_WORDS", 200)?,
            width: parsed_or(&lookup, "IMAGE_WIDTH", 1024)?,
            height: parsed_or(&lookup, "IMAGE_HEIGHT", 512)?,
            max_results: parsed_or(&lookup, "MAX_RESULTS", 1000)?,
            output_dir: PathBuf::from(
                optional(&lookup, "OUTPUT_DIR").unwrap_or_else(|| "output".to_string()),
            ),
            state_dir: PathBuf::from(
                optional(&lookup, "STATE_DIR").unwrap_or_else(|| "state".to_string()),
            ),
            image_description: optional(&lookup, "IMAGE_DESCRIPTION").unwrap_or_default(),
            stopwords_dir: optional(&lookup, "STOPWORDS_DIR").map(PathBuf::from),
            render_command: optional(&lookup, "RENDER_COMMAND")
                .unwrap_or_else(|| "wordcloud_cli".to_string()),
            poll_interval: Duration::from_secs(parsed_or(&lookup, "POLL_INTERVAL_SECS", 300)?),
            reply_pause: Duration::from_secs(parsed_or(&lookup, "REPLY_PAUSE_SECS", 30)?),
            max_reply_length: parsed_or(&lookup, "MAX_REPLY_LENGTH", 140)?,
        };

        info!(
            "Configuration loaded for @{} (hashtags: {})",
            config.bot_name,
            config.hashtags.join(", ")
        );
        Ok(config)
    }
}
