//! The mention dispatcher: the bot's control loop.
//!
//! Each cycle fetches new mentions, then drains the queue oldest first. For
//! every mention the watermark and the queue snapshot are persisted before
//! anything else happens, then the mention is classified and, if it asks
//! for a word cloud, the pipeline runs and a reply is posted. Every mention
//! ends in exactly one [`Outcome`]; none of them stops the loop.

use log::{error, info, warn};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;

use crate::config::BotConfig;
use crate::pipeline::WordCloudPipeline;
use crate::queue::{MentionQueue, RESUPPLY_EVERY};
use crate::twitter::{sanitize_for_logging, Mention, ResilientClient, Sleeper};

/// Decorations appended to replies for users asking about themselves.
pub const DEFAULT_REPLY_SUFFIXES: [&str; 6] = [":D", ":)", ";)", "<3", "\\o/", "(:"];

/// Host prefix of uploaded images.
pub const IMAGE_URL_BASE: &str = "http://imgur.com/";

/// What a mention is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Posted by the bot itself
    SelfMention,
    /// Carries none of the trigger hashtags
    Unqualified,
    /// Asks for the author's own word cloud
    QualifiedSingleTarget,
    /// Asks for the word cloud of another user
    QualifiedOtherTarget(String),
    /// References several users, none of which is someone other than the bot
    QualifiedUnresolvable,
}

/// How the handling of a mention ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SkippedSelf,
    SkippedUnqualified,
    TargetResolutionFailed,
    ImageBuildFailed,
    UploadFailed,
    Replied,
    ReplyFailed,
    ReplySkippedTooLong,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Outcome::SkippedSelf | Outcome::SkippedUnqualified | Outcome::Replied
        )
    }
}

/// Dispatcher settings derived from [`BotConfig`].
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub bot_name: String,
    /// Lowercase trigger hashtags, without #
    pub hashtags: Vec<String>,
    pub max_reply_length: usize,
    pub reply_pause: Duration,
    pub poll_interval: Duration,
    pub reply_suffixes: Vec<String>,
    pub image_url_base: String,
}

impl DispatchSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        DispatchSettings {
            bot_name: config.bot_name.clone(),
            hashtags: config.hashtags.clone(),
            max_reply_length: config.max_reply_length,
            reply_pause: config.reply_pause,
            poll_interval: config.poll_interval,
            reply_suffixes: DEFAULT_REPLY_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            image_url_base: IMAGE_URL_BASE.to_string(),
        }
    }
}

/// Decides what `mention` is asking for.
///
/// Usernames compare ASCII case-insensitively, hashtags case-insensitively
/// against the (lowercase) trigger set.
pub fn classify(mention: &Mention, bot_name: &str, hashtags: &[String]) -> Classification {
    if mention.author.eq_ignore_ascii_case(bot_name) {
        return Classification::SelfMention;
    }

    let qualified = mention
        .hashtags
        .iter()
        .any(|tag| hashtags.contains(&tag.to_lowercase()));
    if !qualified {
        return Classification::Unqualified;
    }

    if mention.mentioned_users.len() > 1 {
        // Besides the bot there's at least one other user in the tweet
        match mention
            .mentioned_users
            .iter()
            .find(|user| !user.eq_ignore_ascii_case(bot_name))
        {
            Some(target) => Classification::QualifiedOtherTarget(target.clone()),
            None => Classification::QualifiedUnresolvable,
        }
    } else {
        Classification::QualifiedSingleTarget
    }
}

/// Composes the reply to `author`.
///
/// `other_target` is the user whose word cloud was requested when it is not
/// the author; `suffix` decorates replies to authors asking about themselves.
pub fn compose_reply(
    author: &str,
    other_target: Option<&str>,
    image_url: &str,
    suffix: &str,
) -> String {
    match other_target {
        Some(target) => format!(
            "@{} here's the word cloud for @{} {}",
            author, target, image_url
        ),
        None if suffix.is_empty() => format!("@{} here's your word cloud {}", author, image_url),
        None => format!("@{} here's your word cloud {} {}", author, suffix, image_url),
    }
}

pub struct MentionDispatcher {
    client: ResilientClient,
    queue: MentionQueue,
    pipeline: WordCloudPipeline,
    sleeper: Arc<dyn Sleeper>,
    settings: DispatchSettings,
}

impl MentionDispatcher {
    pub fn new(
        client: ResilientClient,
        queue: MentionQueue,
        pipeline: WordCloudPipeline,
        sleeper: Arc<dyn Sleeper>,
        settings: DispatchSettings,
    ) -> Self {
        MentionDispatcher {
            client,
            queue,
            pipeline,
            sleeper,
            settings,
        }
    }

    pub fn queue(&self) -> &MentionQueue {
        &self.queue
    }

    /// Runs drain cycles forever, idling between them.
    pub async fn run(&mut self) {
        loop {
            let handled = self.run_cycle().await;
            info!(
                "Handled {} mention(s), sleeping for {} seconds",
                handled.len(),
                self.settings.poll_interval.as_secs()
            );
            self.sleeper.sleep(self.settings.poll_interval).await;
        }
    }

    /// Fetches new mentions and drains the queue.
    ///
    /// The queue is resupplied every [`RESUPPLY_EVERY`] mentions so a long
    /// backlog does not hide mentions that arrive while it is worked off.
    /// Returns the outcome of every mention handled, oldest first.
    pub async fn run_cycle(&mut self) -> Vec<(String, Outcome)> {
        self.resupply().await;

        let mut outcomes = Vec::new();
        loop {
            if !outcomes.is_empty() && outcomes.len() % RESUPPLY_EVERY == 0 {
                self.resupply().await;
            }

            let Some(mention) = self.queue.dequeue_oldest() else {
                break;
            };

            // Write-ahead: a crash from here on skips this mention on restart
            self.queue.mark_initiated(&mention.id);
            self.queue.persist();

            let outcome = self.handle_mention(&mention).await;
            if outcome.is_failure() {
                warn!("Mention {} ended with {:?}", mention.id, outcome);
            } else {
                info!("Mention {} ended with {:?}", mention.id, outcome);
            }

            if outcome == Outcome::Replied {
                self.sleeper.sleep(self.settings.reply_pause).await;
            }
            outcomes.push((mention.id, outcome));
        }

        outcomes
    }

    async fn resupply(&mut self) {
        if let Err(e) = self.queue.fetch_new(&self.client).await {
            error!("Failed to fetch new mentions: {}", e);
        }
    }

    /// Takes one mention through classification, pipeline and reply.
    pub async fn handle_mention(&self, mention: &Mention) -> Outcome {
        info!(
            "Handling mention {} from @{}: {}",
            mention.id,
            mention.author,
            sanitize_for_logging(&mention.text, 280)
        );

        let other_target = match classify(mention, &self.settings.bot_name, &self.settings.hashtags) {
            Classification::SelfMention => {
                info!("Skipping self mention {}", mention.id);
                return Outcome::SkippedSelf;
            }
            Classification::Unqualified => {
                info!(
                    "Skipping mention {} because there are no relevant hashtags",
                    mention.id
                );
                return Outcome::SkippedUnqualified;
            }
            Classification::QualifiedUnresolvable => {
                error!(
                    "Couldn't extract a target user from mention {}",
                    mention.id
                );
                return Outcome::TargetResolutionFailed;
            }
            Classification::QualifiedSingleTarget => None,
            Classification::QualifiedOtherTarget(target) => Some(target),
        };
        let target = other_target.as_deref().unwrap_or(&mention.author);

        let image = match self.pipeline.build_image(&self.client, target).await {
            Ok(image) => image,
            Err(e) => {
                error!("Failed building the word cloud of @{}: {}", target, e);
                return Outcome::ImageBuildFailed;
            }
        };

        let image_id = match self.pipeline.upload_image(&image, target).await {
            Ok(id) => id,
            Err(e) => {
                error!("Image upload failed for @{}: {}", target, e);
                return Outcome::UploadFailed;
            }
        };

        let image_url = format!("{}{}", self.settings.image_url_base, image_id);
        let suffix = self
            .settings
            .reply_suffixes
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("");
        let reply = compose_reply(
            &mention.author,
            other_target.as_deref(),
            &image_url,
            suffix,
        );

        let length = reply.chars().count();
        if length > self.settings.max_reply_length {
            error!(
                "Reply to {} is too long to be posted ({} > {} chars): {}",
                mention.id, length, self.settings.max_reply_length, reply
            );
            return Outcome::ReplySkippedTooLong;
        }

        match self.client.post_reply(&reply, &mention.id).await {
            Ok(Some(_)) => {
                info!("Posted reply: {}", reply);
                Outcome::Replied
            }
            Ok(None) => {
                error!("Reply to {} was not accepted", mention.id);
                Outcome::ReplyFailed
            }
            Err(e) => {
                error!("Reply to {} failed: {}", mention.id, e);
                Outcome::ReplyFailed
            }
        }
    }
}
