//! # Tweetcloud Library
//!
//! A Twitter/X bot that answers mentions carrying a trigger hashtag (by
//! default `#wordcloud`) with a word cloud built from a user's recent tweets.
//! The image is hosted on Imgur and the bot replies with its link.
//!
//! ## Features
//!
//! - Resilient API calls: 401/404 as "nothing to do", 15 minute rate-limit
//!   cooldown, exponential backoff on 5xx, bounded transport retries
//! - Timeline pagination with an id cursor and a page ceiling
//! - Durable mention queue and write-ahead watermark with atomic file replacement
//! - Deterministic text normalization and language-aware stopword filtering
//! - Structured logging
//!
//! ## Configuration
//!
//! The following configuration is required:
//! - `xapi_access_token`: Twitter API OAuth 2.0 User Context access token
//! - `imgur_client_id`: Imgur application Client ID
//! - `BOT_NAME`: username of the bot account
//!
//! See [`BotConfig::from_env`] for the optional settings.

pub mod config;
pub mod dispatcher;
pub mod imgur;
pub mod oauth;
pub mod pipeline;
pub mod queue;
pub mod render;
pub mod store;
pub mod text;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{BotConfig, ImgurConfig, TwitterConfig};
pub use dispatcher::{classify, compose_reply, Classification, MentionDispatcher, Outcome};
pub use oauth::{build_imgur_auth_header, build_oauth2_user_context_header};
pub use pipeline::WordCloudPipeline;
pub use queue::MentionQueue;
pub use store::StateStore;
pub use twitter::{ResilientClient, TwitterApi};
