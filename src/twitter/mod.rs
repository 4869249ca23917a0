//! Twitter/X API integration module.
//!
//! This module contains the raw API client, the resilient retry layer wrapped
//! around it, timeline pagination, and the mention/post data model.

mod api;
mod model;
mod parsing;
mod retry;
mod timeline;

pub use api::{CallError, SocialApi, TwitterApi};
pub use model::{compare_ids, is_newer, Mention, Post};
pub use retry::{ApiError, ResilientClient, RetryPolicy, Sleeper, TokioSleeper, RATE_LIMIT_COOLDOWN};
pub use timeline::MAX_TIMELINE_PAGES;

// Crate-internal re-exports (used by tests and other modules)
#[allow(unused_imports)]
pub(crate) use api::sanitize_for_logging;
#[allow(unused_imports)]
pub(crate) use parsing::{parse_created_tweet_id, parse_mentions, parse_posts};
