//! moebot binary: load config, wire up the clients, run the scheduler until
//! a termination signal arrives.

use moebot::{
    Config, DiscordWebhook, HourlyScheduler, ImageFetcher, PostJob, RedditSource,
    TwitterPublisher, run_with_shutdown,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Number of daily log files kept before the oldest is pruned
const LOG_RETENTION_FILES: usize = 5;

/// Install daily-rotating file logging plus stdout
///
/// Writes go through a non-blocking worker so logging never stalls the job;
/// the returned guard flushes buffered lines on drop.
fn init_logging() -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("moebot")
        .filename_suffix("log")
        .max_log_files(LOG_RETENTION_FILES)
        .build("logs")?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moebot=info")),
        )
        .with_writer(file_writer.and(std::io::stdout))
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("moebot.json"));
    let config = Config::load(&config_path)?;
    info!(config = %config_path.display(), "Configuration loaded");

    let job = Arc::new(PostJob::new(
        Arc::new(RedditSource::new(&config.source)?),
        ImageFetcher::new(config.fetch.timeout())?,
        Arc::new(DiscordWebhook::new(&config.chat)?),
        Arc::new(TwitterPublisher::new(&config.social)?),
        config.fetch.max_retries,
    ));

    let scheduler = HourlyScheduler::new(job, config.timezone()?);
    let cancel = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    run_with_shutdown(cancel).await;
    scheduler_handle.await?;

    info!("Shutdown complete");
    Ok(())
}
