//! Resilient API calls.
//!
//! Every remote call goes through [`ResilientClient::call`], which classifies
//! each failed attempt and decides whether to give up, wait, or retry:
//!
//! | failure | action |
//! |---|---|
//! | 401, 404 | give up with `Ok(None)` ("nothing to do") |
//! | 429 | sleep the rate-limit cooldown, retry |
//! | 500, 502, 503, 504 | sleep an exponential backoff, retry |
//! | transport error | retry immediately, up to a consecutive-error budget |
//! | any other status | give up with [`ApiError::UnexpectedStatus`] |

use async_trait::async_trait;
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::api::{sanitize_for_logging, CallError, SocialApi};
use super::model::Mention;

/// How long the API blocks a client that hit its rate limit.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Something that can suspend the bot for a while.
///
/// All of the bot's waiting goes through this trait so tests can observe
/// the waits without spending real time on them.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Tuning of [`ResilientClient::call`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub rate_limit_cooldown: Duration,
    /// First wait after a 5xx response
    pub initial_backoff: Duration,
    /// Growth factor of the wait after each 5xx response
    pub backoff_multiplier: f64,
    /// Upper bound of a single 5xx wait; retries continue at this interval
    pub max_backoff: Duration,
    /// Consecutive transport errors tolerated before the call is abandoned
    pub max_transport_errors: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            initial_backoff: Duration::from_secs(2),
            backoff_multiplier: 1.5,
            max_backoff: Duration::from_secs(60 * 60),
            max_transport_errors: 10,
        }
    }
}

/// A call that could not be completed. Aborts the current operation only.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("operation '{operation}' aborted after {errors} consecutive transport errors: {last_error}")]
    TooManyTransportErrors {
        operation: String,
        errors: u32,
        last_error: String,
    },
    #[error("operation '{operation}' failed with unexpected status {status}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },
}

/// Wraps a [`SocialApi`] with error classification, backoff and rate-limit handling.
pub struct ResilientClient {
    api: Arc<dyn SocialApi>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(api: Arc<dyn SocialApi>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::with_policy(api, sleeper, RetryPolicy::default())
    }

    pub fn with_policy(
        api: Arc<dyn SocialApi>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        ResilientClient {
            api,
            sleeper,
            policy,
        }
    }

    pub(crate) fn api(&self) -> &dyn SocialApi {
        self.api.as_ref()
    }

    /// Runs `request` until it succeeds or its failure is final.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: an attempt succeeded
    /// - `Ok(None)`: the server answered 401 or 404; there is nothing to do
    /// - `Err(ApiError)`: an unexpected status, or too many consecutive transport errors
    pub async fn call<T, F, Fut>(&self, operation: &str, mut request: F) -> Result<Option<T>, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut backoff = self.policy.initial_backoff;
        let mut transport_errors = 0u32;

        loop {
            match request().await {
                Ok(value) => return Ok(Some(value)),
                Err(CallError::Status { code, body }) => {
                    transport_errors = 0;
                    match code {
                        401 => {
                            warn!("Encountered 401 Error (Not Authorized) for '{}'", operation);
                            return Ok(None);
                        }
                        404 => {
                            warn!("Encountered 404 Error (Not Found) for '{}'", operation);
                            return Ok(None);
                        }
                        429 => {
                            self.wait_for_rate_limit(operation).await;
                            backoff = self.policy.initial_backoff;
                        }
                        500 | 502 | 503 | 504 => {
                            warn!(
                                "Encountered {} Error for '{}'. Retrying in {:.1} seconds",
                                code,
                                operation,
                                backoff.as_secs_f64()
                            );
                            self.sleeper.sleep(backoff).await;
                            backoff = self.next_backoff(backoff);
                        }
                        _ => {
                            error!(
                                "Operation '{}' failed with status {}: {}",
                                operation,
                                code,
                                sanitize_for_logging(&body, 200)
                            );
                            return Err(ApiError::UnexpectedStatus {
                                operation: operation.to_string(),
                                status: code,
                                body,
                            });
                        }
                    }
                }
                Err(CallError::Transport(message)) => {
                    transport_errors += 1;
                    if transport_errors > self.policy.max_transport_errors {
                        error!(
                            "Too many consecutive errors for '{}' - bailing out",
                            operation
                        );
                        return Err(ApiError::TooManyTransportErrors {
                            operation: operation.to_string(),
                            errors: transport_errors,
                            last_error: message,
                        });
                    }
                    warn!(
                        "Transport error {} for '{}': {}. Continuing.",
                        transport_errors, operation, message
                    );
                }
            }
        }
    }

    /// Blocks until the rate-limit window has passed.
    async fn wait_for_rate_limit(&self, operation: &str) {
        warn!(
            "Encountered 429 Error (Rate Limit Exceeded) for '{}'. Retrying in {} minutes",
            operation,
            self.policy.rate_limit_cooldown.as_secs() / 60
        );
        self.sleeper.sleep(self.policy.rate_limit_cooldown).await;
        info!("Rate limit cooldown over, retrying '{}'", operation);
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current
            .mul_f64(self.policy.backoff_multiplier)
            .min(self.policy.max_backoff)
    }

    /// Mentions of the bot newer than `since_id`, newest first.
    ///
    /// A 401/404 answer yields an empty list.
    pub async fn fetch_mentions(&self, since_id: Option<&str>) -> Result<Vec<Mention>, ApiError> {
        let api = self.api();
        let mentions = self
            .call("fetch_mentions", move || api.fetch_mentions(since_id))
            .await?
            .unwrap_or_default();
        info!(
            "Fetched {} mentions since {}",
            mentions.len(),
            since_id.unwrap_or("the beginning")
        );
        Ok(mentions)
    }

    /// Posts a reply, returning the new tweet's id, or `None` on a 401/404 answer.
    pub async fn post_reply(&self, text: &str, in_reply_to: &str) -> Result<Option<String>, ApiError> {
        let api = self.api();
        let posted = self
            .call("post_reply", move || api.post_reply(text, in_reply_to))
            .await?;
        // A success without an id in the body still means the tweet exists
        Ok(posted.map(|id| id.unwrap_or_default()))
    }
}
