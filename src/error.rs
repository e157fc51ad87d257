//! Error types for moebot
//!
//! This module provides the error taxonomy for one job invocation:
//! - Domain-specific error types (Source, Fetch, ChatPublish, SocialPublish)
//! - A top-level [`Error`] with `#[from]` conversions for each domain
//! - The [`RetrievalExhausted`](Error::RetrievalExhausted) terminal condition
//!
//! All errors are local to a single invocation; nothing is persisted or
//! retried across scheduler ticks.

use thiserror::Error;

/// Result type alias for moebot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for moebot
///
/// This is the primary error type used throughout the crate. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "timezone")
        key: Option<String>,
    },

    /// Every retrieval attempt returned a submission without a usable image URL
    #[error("no valid submission after {attempts} attempts")]
    RetrievalExhausted {
        /// Number of retrieval attempts made before giving up
        attempts: u32,
    },

    /// Content source retrieval error
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Image download error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Chat webhook publish error
    #[error("chat publish error: {0}")]
    ChatPublish(#[from] ChatPublishError),

    /// Social media publish error
    #[error("social publish error: {0}")]
    SocialPublish(#[from] SocialPublishError),

    /// I/O error (temp file creation or write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Content source retrieval errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Authentication against the content source failed
    #[error("authentication failed with HTTP {status}")]
    AuthFailed {
        /// HTTP status code returned by the token endpoint
        status: u16,
    },

    /// The source returned a non-success HTTP status
    #[error("source returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// The response body could not be interpreted as a submission
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// Transport-level failure (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Image download errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// The image host returned a non-success HTTP status
    #[error("image host returned HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The image URL that was requested
        url: String,
    },

    /// Transport-level failure (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Chat webhook publish errors
#[derive(Debug, Error)]
pub enum ChatPublishError {
    /// The webhook endpoint rejected the request
    #[error("webhook returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated) for diagnostics
        body: String,
    },

    /// Transport-level failure (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Social media publish errors
#[derive(Debug, Error)]
pub enum SocialPublishError {
    /// The media upload step failed
    #[error("media upload returned HTTP {status}: {body}")]
    MediaUpload {
        /// HTTP status code
        status: u16,
        /// Response body (truncated) for diagnostics
        body: String,
    },

    /// The status update step failed
    #[error("status update returned HTTP {status}: {body}")]
    StatusUpdate {
        /// HTTP status code
        status: u16,
        /// Response body (truncated) for diagnostics
        body: String,
    },

    /// The upload response did not contain a media id
    #[error("media upload response missing media id")]
    MissingMediaId,

    /// Reading the downloaded image from disk failed
    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure (DNS, connect, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_exhausted_display() {
        let err = Error::RetrievalExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "no valid submission after 5 attempts");
    }

    #[test]
    fn test_fetch_status_display_includes_url() {
        let err = FetchError::Status {
            status: 404,
            url: "https://cdn.example/pic.jpg".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("https://cdn.example/pic.jpg"));
    }

    #[test]
    fn test_domain_errors_convert_to_top_level() {
        let err: Error = ChatPublishError::Status {
            status: 400,
            body: "bad payload".to_string(),
        }
        .into();
        assert!(matches!(err, Error::ChatPublish(_)));
    }
}
