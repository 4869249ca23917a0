//! The word cloud pipeline.
//!
//! timeline harvest → stopword filtering → external renderer → image host.
//!
//! Rendering and hosting are external collaborators behind the [`Renderer`]
//! and [`Uploader`] traits. The pipeline owns the policy around them: empty
//! inputs are rejected before rendering, and uploads are retried a bounded
//! number of times.

use async_trait::async_trait;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::text::{filter_batch, StopwordDictionary};
use crate::twitter::{ApiError, ResilientClient, Sleeper};

/// Tweets requested per timeline page (the API maximum).
pub const TIMELINE_PAGE_SIZE: usize = 100;

/// Image dimensions and word budget handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("renderer failed: {0}")]
    Failed(String),
}

/// Draws a word cloud image from a token stream.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `tokens` into an image file at `output`. `tokens` is never empty.
    async fn render(
        &self,
        tokens: &[String],
        output: &Path,
        settings: &RenderSettings,
    ) -> Result<(), RenderError>;
}

/// Title and description attached to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    /// The host refuses uploads for now; retrying soon is pointless.
    #[error("image host rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    Failed(String),
}

/// Publishes an image and returns its id on the hosting service.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path, metadata: &ImageMetadata) -> Result<String, UploadError>;
}

/// How hard the pipeline tries to upload an image.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Pause before each retry
    pub retry_sleep: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadPolicy {
            max_retries: 3,
            retry_sleep: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("timeline harvest aborted: {0}")]
    Api(#[from] ApiError),
    #[error("@{0} has no tweets to sample")]
    NoPosts(String),
    #[error("no words left for @{0} after filtering")]
    NoTokens(String),
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("upload failed after {attempts} attempt(s): {source}")]
    Upload {
        attempts: u32,
        #[source]
        source: UploadError,
    },
}

/// Fixed inputs of the pipeline, taken from the bot configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_results: usize,
    pub page_size: usize,
    pub render: RenderSettings,
    pub output_dir: PathBuf,
    pub image_description: String,
}

pub struct WordCloudPipeline {
    renderer: Box<dyn Renderer>,
    uploader: Box<dyn Uploader>,
    stopwords: Arc<StopwordDictionary>,
    sleeper: Arc<dyn Sleeper>,
    settings: PipelineSettings,
    upload_policy: UploadPolicy,
}

/// Title of the uploaded image for `username`.
pub fn image_title(username: &str) -> String {
    format!("Word cloud of http://twitter.com/{}", username)
}

impl WordCloudPipeline {
    pub fn new(
        renderer: Box<dyn Renderer>,
        uploader: Box<dyn Uploader>,
        stopwords: Arc<StopwordDictionary>,
        sleeper: Arc<dyn Sleeper>,
        settings: PipelineSettings,
    ) -> Self {
        WordCloudPipeline {
            renderer,
            uploader,
            stopwords,
            sleeper,
            settings,
            upload_policy: UploadPolicy::default(),
        }
    }

    pub fn with_upload_policy(mut self, upload_policy: UploadPolicy) -> Self {
        self.upload_policy = upload_policy;
        self
    }

    /// Builds the word cloud image of `username` and returns its path.
    pub async fn build_image(
        &self,
        client: &ResilientClient,
        username: &str,
    ) -> Result<PathBuf, PipelineError> {
        let posts = client
            .fetch_user_posts(username, self.settings.max_results, self.settings.page_size)
            .await?;
        if posts.is_empty() {
            return Err(PipelineError::NoPosts(username.to_string()));
        }

        let tokens = filter_batch(&posts, &self.stopwords);
        if tokens.is_empty() {
            return Err(PipelineError::NoTokens(username.to_string()));
        }
        info!(
            "Rendering word cloud of @{} from {} tokens ({} tweets)",
            username,
            tokens.len(),
            posts.len()
        );

        tokio::fs::create_dir_all(&self.settings.output_dir)
            .await
            .map_err(RenderError::from)?;
        let output = self.settings.output_dir.join(format!(
            "{}{}.png",
            chrono::Utc::now().timestamp(),
            username
        ));

        self.renderer
            .render(&tokens, &output, &self.settings.render)
            .await?;
        info!("Word cloud of @{} written to {}", username, output.display());
        Ok(output)
    }

    /// Uploads the image built for `username` and returns its hosted id.
    ///
    /// Failed attempts are retried after a fixed pause, up to
    /// [`UploadPolicy::max_retries`] times. A rate-limit answer ends the
    /// upload immediately.
    pub async fn upload_image(&self, path: &Path, username: &str) -> Result<String, PipelineError> {
        let title = image_title(username);
        let metadata = ImageMetadata {
            description: format!("{}\n{}", title, self.settings.image_description),
            title,
        };

        let mut failures = 0u32;
        loop {
            info!("Uploading image {}", path.display());
            match self.uploader.upload(path, &metadata).await {
                Ok(id) => {
                    info!("Uploaded {} as {}", path.display(), id);
                    return Ok(id);
                }
                Err(UploadError::RateLimited) => {
                    error!("Image host rate limit hit, giving up on {}", path.display());
                    return Err(PipelineError::Upload {
                        attempts: failures + 1,
                        source: UploadError::RateLimited,
                    });
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.upload_policy.max_retries {
                        error!("Giving up on {} after {} errors", path.display(), failures);
                        return Err(PipelineError::Upload {
                            attempts: failures,
                            source: e,
                        });
                    }
                    warn!(
                        "Upload error: {}. Encountered {} error(s), retrying in {} seconds",
                        e,
                        failures,
                        self.upload_policy.retry_sleep.as_secs()
                    );
                    self.sleeper.sleep(self.upload_policy.retry_sleep).await;
                }
            }
        }
    }
}
