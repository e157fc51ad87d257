//! Discord webhook publish target.

use crate::config::ChatConfig;
use crate::error::ChatPublishError;
use crate::publish::ChatPublisher;
use crate::source::PostInfo;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Maximum response-body length kept for error diagnostics
const ERROR_BODY_LIMIT: usize = 512;

/// Publishes submissions to a Discord webhook
///
/// The image bytes are attached to the message and referenced from an embed
/// that also carries the submission title, author, and link. Discord treats a
/// non-2xx response as rejection; anything else is considered delivered.
pub struct DiscordWebhook {
    http_client: reqwest::Client,
    webhook_url: String,
}

impl DiscordWebhook {
    /// Create a new webhook publisher
    ///
    /// # Errors
    /// Returns [`ChatPublishError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &ChatConfig) -> Result<Self, ChatPublishError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            webhook_url: config.webhook_url.clone(),
        })
    }

    /// Attachment filename derived from the image URL, falling back to a
    /// fixed name when the URL has no path segment
    fn attachment_name(info: &PostInfo) -> String {
        info.image
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("image")
            .to_string()
    }
}

#[async_trait]
impl ChatPublisher for DiscordWebhook {
    async fn publish(&self, info: &PostInfo, image: &Bytes) -> Result<(), ChatPublishError> {
        let filename = Self::attachment_name(info);

        let payload = serde_json::json!({
            "embeds": [{
                "title": info.title,
                "url": info.post_url,
                "author": { "name": format!("u/{}", info.author) },
                "image": { "url": format!("attachment://{}", filename) }
            }]
        });

        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part(
                "files[0]",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name(filename),
            );

        debug!(title = %info.title, "Posting submission to webhook");
        let response = self
            .http_client
            .post(&self.webhook_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(ChatPublishError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Webhook delivered");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn info() -> PostInfo {
        PostInfo {
            title: "A cat".to_string(),
            author: "someone".to_string(),
            post_url: "https://www.reddit.com/r/x/comments/1/".to_string(),
            image: Some("https://i.example/cute/cat.png".to_string()),
        }
    }

    #[test]
    fn test_attachment_name_is_last_path_segment() {
        assert_eq!(DiscordWebhook::attachment_name(&info()), "cat.png");
    }

    #[test]
    fn test_attachment_name_falls_back_without_url() {
        let mut info = info();
        info.image = None;
        assert_eq!(DiscordWebhook::attachment_name(&info), "image");
    }

    #[tokio::test]
    async fn test_publish_posts_multipart_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = DiscordWebhook::new(&ChatConfig {
            webhook_url: format!("{}/api/webhooks/1/token", server.uri()),
        })
        .unwrap();

        let bytes = Bytes::from_static(b"img");
        webhook.publish(&info(), &bytes).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_non_2xx_is_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/token"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let webhook = DiscordWebhook::new(&ChatConfig {
            webhook_url: format!("{}/api/webhooks/1/token", server.uri()),
        })
        .unwrap();

        let bytes = Bytes::from_static(b"img");
        let err = webhook.publish(&info(), &bytes).await.unwrap_err();
        assert!(
            matches!(err, ChatPublishError::Status { status: 429, ref body } if body == "rate limited")
        );
    }
}
