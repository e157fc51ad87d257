//! # moebot
//!
//! Scheduled bot that reposts random Reddit images to Discord and Twitter.
//!
//! Once per hour the bot pulls a random submission from a configured
//! subreddit, checks that it carries a directly-postable image URL (retrying
//! a bounded number of times when it does not), downloads the image, and
//! publishes it concurrently to a Discord webhook and to Twitter.
//!
//! ## Quick Start
//!
//! ```no_run
//! use moebot::{
//!     Config, DiscordWebhook, HourlyScheduler, ImageFetcher, PostJob, RedditSource,
//!     TwitterPublisher, run_with_shutdown,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(std::path::Path::new("moebot.json"))?;
//!
//!     let job = Arc::new(PostJob::new(
//!         Arc::new(RedditSource::new(&config.source)?),
//!         ImageFetcher::new(config.fetch.timeout())?,
//!         Arc::new(DiscordWebhook::new(&config.chat)?),
//!         Arc::new(TwitterPublisher::new(&config.social)?),
//!         config.fetch.max_retries,
//!     ));
//!
//!     let scheduler = HourlyScheduler::new(job, config.timezone()?);
//!     let cancel = CancellationToken::new();
//!     tokio::spawn(scheduler.run(cancel.clone()));
//!
//!     // Blocks until SIGTERM/SIGINT, then stops the scheduler
//!     run_with_shutdown(cancel).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Image download over HTTP
pub mod fetcher;
/// The repost job (orchestrator)
pub mod job;
/// Publish fan-out and target implementations
pub mod publish;
/// Hourly scheduling
pub mod scheduler;
/// Content source client
pub mod source;

// Re-export commonly used types
pub use config::{ChatConfig, Config, FetchConfig, ScheduleConfig, SocialConfig, SourceConfig};
pub use error::{
    ChatPublishError, Error, FetchError, Result, SocialPublishError, SourceError,
};
pub use fetcher::ImageFetcher;
pub use job::{PostJob, is_valid_image_url, temp_suffix};
pub use publish::{ChatPublisher, DiscordWebhook, SocialPublisher, TwitterPublisher};
pub use scheduler::HourlyScheduler;
pub use source::{ContentSource, PostInfo, RedditSource};

use tokio_util::sync::CancellationToken;

/// Wait for a termination signal, then cancel the given token.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(cancel: CancellationToken) {
    wait_for_signal().await;
    cancel.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        _ => {
            tracing::warn!("Could not register unix signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
