//! # Tweetcloud
//!
//! A Twitter/X bot that replies to `#wordcloud` mentions with a word cloud of
//! the requested user's recent tweets.
//!
//! ## Environment Variables
//!
//! The following environment variables are required:
//! - `xapi_access_token`: Twitter API Access token (OAuth 2.0 User Context)
//! - `imgur_client_id`: Imgur application Client ID
//! - `BOT_NAME`: username of the bot account
//!
//! See `BotConfig::from_env` for the optional ones.

use log::{error, info};
use std::sync::Arc;

use tweetcloud::dispatcher::DispatchSettings;
use tweetcloud::imgur::ImgurUploader;
use tweetcloud::pipeline::{PipelineSettings, RenderSettings, TIMELINE_PAGE_SIZE};
use tweetcloud::render::CommandRenderer;
use tweetcloud::text::StopwordDictionary;
use tweetcloud::twitter::{Sleeper, TokioSleeper};
use tweetcloud::{
    BotConfig, MentionDispatcher, MentionQueue, ResilientClient, StateStore, TwitterApi,
    WordCloudPipeline,
};

/// Wires the bot together from its configuration.
fn build_dispatcher(
    config: &BotConfig,
) -> Result<MentionDispatcher, Box<dyn std::error::Error + Send + Sync>> {
    let stopwords = match &config.stopwords_dir {
        Some(dir) => StopwordDictionary::load_dir(dir)?,
        None => StopwordDictionary::builtin(),
    };
    let mut languages: Vec<&str> = stopwords.languages().collect();
    languages.sort_unstable();
    info!("Stopword dictionaries available for: {}", languages.join(", "));

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let api = Arc::new(TwitterApi::new(config.twitter.clone(), &config.bot_name));
    let client = ResilientClient::new(api, sleeper.clone());

    let queue = MentionQueue::load_persisted(StateStore::open(&config.state_dir)?)?;

    let pipeline = WordCloudPipeline::new(
        Box::new(CommandRenderer::new(config.render_command.clone())),
        Box::new(ImgurUploader::new(config.imgur.clone())),
        Arc::new(stopwords),
        sleeper.clone(),
        PipelineSettings {
            max_results: config.max_results,
            page_size: TIMELINE_PAGE_SIZE,
            render: RenderSettings {
                width: config.width,
                height: config.height,
                max_words: config.max_words,
            },
            output_dir: config.output_dir.clone(),
            image_description: config.image_description.clone(),
        },
    );

    Ok(MentionDispatcher::new(
        client,
        queue,
        pipeline,
        sleeper,
        DispatchSettings::from_config(config),
    ))
}

/// Main entry point for the tweetcloud bot.
///
/// Initializes logging, loads the configuration, restores the persisted
/// queue and runs the mention loop until Ctrl+C is received. Only a
/// configuration or startup error ends the process early.
///
/// # Logging
///
/// The application uses the `env_logger` crate for structured logging. Log levels
/// can be controlled via the `RUST_LOG` environment variable.
///
/// # Example Usage
///
/// ```bash
/// BOT_NAME=mybot xapi_access_token=... imgur_client_id=... RUST_LOG=info cargo run
/// ```
#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut dispatcher = match build_dispatcher(&config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("Failed to start the bot: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting tweetcloud bot as @{}", config.bot_name);

    tokio::select! {
        _ = dispatcher.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Received shutdown signal, stopping");
        }
    }
}
