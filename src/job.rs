//! The repost job: retrieve, validate, download, fan out.
//!
//! One [`PostJob::run_once`] call is one complete invocation: it pulls
//! candidate submissions from the content source until one carries a
//! well-formed image URL (bounded by the retry ceiling), downloads the image,
//! and publishes it to both targets concurrently. The downloaded image lives
//! in a named temp file that is removed when the invocation ends, whether the
//! fan-out succeeded or not.

use crate::error::{Error, Result};
use crate::fetcher::ImageFetcher;
use crate::publish::{ChatPublisher, SocialPublisher, fan_out};
use crate::source::{ContentSource, PostInfo};
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{error, info, warn};

/// Accepted image URL shape: http(s), at least one path segment, ending in
/// one of the four supported extensions.
static IMAGE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^https?://\S+?/\S+?\.(jpg|jpeg|gif|png)$").expect("image URL pattern is valid")
});

/// Whether a URL points at a directly-postable image
///
/// The match is anchored at both ends and case-sensitive; only `jpg`, `jpeg`,
/// `gif`, and `png` extensions are accepted.
pub fn is_valid_image_url(url: &str) -> bool {
    IMAGE_URL_RE.is_match(url)
}

/// Temp-file suffix for a downloaded image: the last 3 characters of its URL
///
/// This is deliberately not an extension parser. A URL ending in `.jpeg`
/// yields `peg` and one ending in `.png` yields `png`; downstream consumers
/// see exactly this truncated value, so it is preserved as-is.
pub fn temp_suffix(url: &str) -> String {
    let start = url
        .char_indices()
        .rev()
        .nth(2)
        .map(|(i, _)| i)
        .unwrap_or(0);
    url[start..].to_string()
}

/// One scheduled invocation of the repost pipeline
///
/// Holds the content source, the image fetcher, and both publish targets.
/// The scheduler calls [`run_once`](PostJob::run_once) per tick; errors are
/// logged by the caller and never cross tick boundaries.
pub struct PostJob {
    source: Arc<dyn ContentSource>,
    fetcher: ImageFetcher,
    chat: Arc<dyn ChatPublisher>,
    social: Arc<dyn SocialPublisher>,
    max_retries: u32,
}

impl PostJob {
    /// Create a new job over the given collaborators
    ///
    /// `max_retries` bounds how many structurally-invalid submissions one
    /// invocation tolerates before aborting (the configuration default is 5).
    pub fn new(
        source: Arc<dyn ContentSource>,
        fetcher: ImageFetcher,
        chat: Arc<dyn ChatPublisher>,
        social: Arc<dyn SocialPublisher>,
        max_retries: u32,
    ) -> Self {
        Self {
            source,
            fetcher,
            chat,
            social,
            max_retries,
        }
    }

    /// Run one complete invocation
    ///
    /// # Errors
    /// - [`Error::RetrievalExhausted`] after `max_retries` invalid candidates
    ///   (nothing was downloaded or published)
    /// - [`Error::Source`] if retrieval itself fails (does not consume a retry)
    /// - [`Error::Fetch`] if the image download fails
    /// - [`Error::ChatPublish`] / [`Error::SocialPublish`] if a publish target
    ///   fails after both have settled
    pub async fn run_once(&self) -> Result<()> {
        info!("Starting job");

        let (info, image_url) = self.retrieve_valid_submission().await?;

        info!(url = %image_url, "Retrieving image for publishing");
        let image = self.fetcher.fetch(&image_url).await?;

        // The temp file carries the last 3 characters of the URL as its
        // suffix and is removed on drop, success or failure.
        let temp_file = tempfile::Builder::new()
            .prefix("moebot-")
            .suffix(&temp_suffix(&image_url))
            .tempfile()?;
        tokio::fs::write(temp_file.path(), &image).await?;

        info!("Posting to chat and social targets");
        let result = fan_out(
            self.chat.as_ref(),
            self.social.as_ref(),
            &info,
            &image,
            temp_file.path(),
        )
        .await;

        drop(temp_file);
        result?;

        info!("Successfully completed job");
        Ok(())
    }

    /// Retrieve candidates until one passes the validity check
    ///
    /// Each structurally-invalid candidate consumes one retry; retrieval
    /// errors propagate immediately without consuming one.
    async fn retrieve_valid_submission(&self) -> Result<(PostInfo, String)> {
        let mut retries = 0u32;

        loop {
            if retries >= self.max_retries {
                error!(
                    attempts = retries,
                    "Failed to retrieve a valid submission in the allowed tries"
                );
                return Err(Error::RetrievalExhausted { attempts: retries });
            }

            let info = self.source.get_submission().await?;

            if let Some(url) = info.image.as_deref()
                && is_valid_image_url(url)
            {
                info!(title = %info.title, "Successfully retrieved submission");
                let url = url.to_string();
                return Ok((info, url));
            }

            warn!("Submission has no usable image URL, retrying");
            retries += 1;
        }
    }
}
