//! Image download over HTTP.

use crate::error::FetchError;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// Downloads image bytes from a validated URL
///
/// Performs a single GET with no automatic retry and buffers the full
/// response body. The client carries a request timeout (default 30 seconds)
/// so a stalled image host cannot wedge an invocation.
pub struct ImageFetcher {
    http_client: reqwest::Client,
}

impl ImageFetcher {
    /// Create a new image fetcher with the given request timeout
    ///
    /// # Errors
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("moebot image fetcher")
            .build()?;

        Ok(Self { http_client })
    }

    /// Download the full body at `url`
    ///
    /// # Errors
    /// Returns [`FetchError::Status`] for a non-2xx response and
    /// [`FetchError::Transport`] for connection or timeout failures.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        debug!(url = %url, "Downloading image");

        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Image downloaded");
        Ok(bytes)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_buffers_full_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pic.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(Duration::from_secs(5)).unwrap();
        let bytes = fetcher
            .fetch(&format!("{}/pic.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(bytes.as_ref(), b"jpegdata");
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = ImageFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/gone.png", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
