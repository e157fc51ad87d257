//! Publish fan-out to the chat and social targets.
//!
//! The two publish operations are independent: no shared mutable state, each
//! receives a read-only view of the same metadata and the same downloaded
//! image. [`fan_out`] runs both concurrently, waits for *both* to settle
//! regardless of individual failure, logs every failure, and then surfaces
//! the chat error first if either branch failed.

/// Discord webhook publisher
pub mod discord;
/// Twitter publisher
pub mod twitter;

use crate::error::{ChatPublishError, SocialPublishError};
use crate::source::PostInfo;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tracing::error;

pub use discord::DiscordWebhook;
pub use twitter::TwitterPublisher;

/// Chat webhook publish target
///
/// Receives the submission metadata and the raw image bytes.
#[async_trait]
pub trait ChatPublisher: Send + Sync {
    /// Publish one submission to the chat target
    async fn publish(&self, info: &PostInfo, image: &Bytes) -> Result<(), ChatPublishError>;
}

/// Social media publish target
///
/// Receives the submission metadata and the path of the downloaded image
/// file (the social API uploads from disk).
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Publish one submission to the social target
    async fn publish(&self, info: &PostInfo, image_path: &Path)
    -> Result<(), SocialPublishError>;
}

/// Invoke both publish targets concurrently and wait for both to settle
///
/// Each target is attempted exactly once. Failures are logged as they are
/// observed; after both branches settle the first error (chat before social)
/// is returned so the invocation aborts with a single representative cause.
///
/// # Errors
/// Returns the chat error if the chat publish failed, otherwise the social
/// error if the social publish failed.
pub async fn fan_out(
    chat: &dyn ChatPublisher,
    social: &dyn SocialPublisher,
    info: &PostInfo,
    image: &Bytes,
    image_path: &Path,
) -> crate::error::Result<()> {
    let (chat_result, social_result) =
        tokio::join!(chat.publish(info, image), social.publish(info, image_path));

    if let Err(e) = &chat_result {
        error!(error = %e, "Chat publish failed");
    }
    if let Err(e) = &social_result {
        error!(error = %e, "Social publish failed");
    }

    chat_result?;
    social_result?;
    Ok(())
}
