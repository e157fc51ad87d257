//! Twitter publish target.
//!
//! Publishing is a two-step v1.1 flow: the image is uploaded with
//! `media/upload`, then a status referencing the returned media id is posted
//! with `statuses/update`. Both requests are signed with OAuth 1.0a
//! (HMAC-SHA1). Multipart bodies are excluded from the signature base string;
//! form-encoded bodies are included, per OAuth 1.0a.

use crate::config::SocialConfig;
use crate::error::SocialPublishError;
use crate::publish::SocialPublisher;
use crate::source::PostInfo;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use sha1::Sha1;
use std::path::Path;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

/// Maximum response-body length kept for error diagnostics
const ERROR_BODY_LIMIT: usize = 512;

/// Maximum status length; longer compositions are truncated on a char
/// boundary before posting
const STATUS_LIMIT: usize = 280;

/// Publishes submissions to Twitter via the v1.1 REST API
pub struct TwitterPublisher {
    http_client: reqwest::Client,
    credentials: SocialConfig,
    upload_base: String,
    api_base: String,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: Option<String>,
}

impl TwitterPublisher {
    /// Create a new Twitter publisher from credentials
    ///
    /// # Errors
    /// Returns [`SocialPublishError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(credentials: &SocialConfig) -> Result<Self, SocialPublishError> {
        Self::with_endpoints(
            credentials,
            "https://upload.twitter.com".to_string(),
            "https://api.twitter.com".to_string(),
        )
    }

    /// Create a Twitter publisher against explicit endpoints
    ///
    /// Used by tests to point the client at a local mock server.
    ///
    /// # Errors
    /// Returns [`SocialPublishError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn with_endpoints(
        credentials: &SocialConfig,
        upload_base: String,
        api_base: String,
    ) -> Result<Self, SocialPublishError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            credentials: credentials.clone(),
            upload_base,
            api_base,
        })
    }

    /// Build the `Authorization: OAuth ...` header for one request
    ///
    /// `body_params` must contain the form-encoded body parameters for
    /// form-encoded requests and be empty for multipart requests.
    fn authorization_header(&self, method: &str, url: &str, body_params: &[(&str, &str)]) -> String {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        sign_request(
            &self.credentials,
            method,
            url,
            body_params,
            &nonce,
            &timestamp,
        )
    }

    /// Compose the status text from submission metadata
    fn status_text(info: &PostInfo) -> String {
        let text = format!("{} by u/{} {}", info.title, info.author, info.post_url);
        if text.chars().count() <= STATUS_LIMIT {
            return text;
        }
        text.chars().take(STATUS_LIMIT).collect()
    }

    /// Upload the image and return its media id
    async fn upload_media(&self, image_path: &Path) -> Result<String, SocialPublishError> {
        let bytes = tokio::fs::read(image_path).await?;
        let url = format!("{}/1.1/media/upload.json", self.upload_base);

        let form = reqwest::multipart::Form::new()
            .part("media", reqwest::multipart::Part::bytes(bytes));

        debug!(path = %image_path.display(), "Uploading media");
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", self.authorization_header("POST", &url, &[]))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(SocialPublishError::MediaUpload {
                status: status.as_u16(),
                body,
            });
        }

        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(SocialPublishError::Transport)?;

        upload
            .media_id_string
            .ok_or(SocialPublishError::MissingMediaId)
    }

    /// Post a status referencing an already-uploaded media id
    async fn update_status(
        &self,
        status_text: &str,
        media_id: &str,
    ) -> Result<(), SocialPublishError> {
        let url = format!("{}/1.1/statuses/update.json", self.api_base);
        let params: [(&str, &str); 2] = [("media_ids", media_id), ("status", status_text)];

        debug!(media_id = %media_id, "Posting status update");
        let response = self
            .http_client
            .post(&url)
            .header(
                "Authorization",
                self.authorization_header("POST", &url, &params),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(SocialPublishError::StatusUpdate {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl SocialPublisher for TwitterPublisher {
    async fn publish(
        &self,
        info: &PostInfo,
        image_path: &Path,
    ) -> Result<(), SocialPublishError> {
        let media_id = self.upload_media(image_path).await?;
        self.update_status(&Self::status_text(info), &media_id)
            .await?;
        debug!("Status posted");
        Ok(())
    }
}

/// Percent-encode per RFC 3986 (unreserved characters only left bare)
fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build a complete OAuth 1.0a authorization header value
///
/// Separated from [`TwitterPublisher`] so the signature can be exercised with
/// a fixed nonce and timestamp.
fn sign_request(
    credentials: &SocialConfig,
    method: &str,
    url: &str,
    body_params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> String {
    let oauth_params: [(&str, &str); 6] = [
        ("oauth_consumer_key", &credentials.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", &credentials.access_token),
        ("oauth_version", "1.0"),
    ];

    // Parameter string: all params percent-encoded, sorted by encoded key.
    let mut encoded: Vec<(String, String)> = oauth_params
        .iter()
        .chain(body_params.iter())
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method,
        percent_encode(url),
        percent_encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.consumer_secret),
        percent_encode(&credentials.access_token_secret)
    );

    #[allow(clippy::expect_used)]
    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let mut header_params: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    header_params.push((
        "oauth_signature".to_string(),
        percent_encode(&signature),
    ));
    header_params.sort();

    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", fields)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> SocialConfig {
        SocialConfig {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
        }
    }

    fn info() -> PostInfo {
        PostInfo {
            title: "A cat".to_string(),
            author: "someone".to_string(),
            post_url: "https://www.reddit.com/r/x/comments/1/".to_string(),
            image: Some("https://i.example/cat.png".to_string()),
        }
    }

    // Known-answer vector from the OAuth 1.0a documentation example.
    #[test]
    fn test_signature_matches_reference_vector() {
        let credentials = SocialConfig {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        };

        let header = sign_request(
            &credentials,
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ],
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            "1318622958",
        );

        let expected = percent_encode("hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
        assert!(
            header.contains(&format!("oauth_signature=\"{}\"", expected)),
            "header was: {}",
            header
        );
    }

    #[test]
    fn test_percent_encode_is_rfc3986() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("safe-chars_.~"), "safe-chars_.~");
    }

    #[test]
    fn test_status_text_composition() {
        assert_eq!(
            TwitterPublisher::status_text(&info()),
            "A cat by u/someone https://www.reddit.com/r/x/comments/1/"
        );
    }

    #[test]
    fn test_status_text_truncated_to_limit() {
        let mut info = info();
        info.title = "x".repeat(400);
        assert_eq!(TwitterPublisher::status_text(&info).chars().count(), 280);
    }

    #[tokio::test]
    async fn test_publish_uploads_then_updates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(header_regex("authorization", "^OAuth "))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "media_id_string": "12345"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/statuses/update.json"))
            .and(header_regex("authorization", "^OAuth "))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id_str": "67890"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let image = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(image.path(), b"img").unwrap();

        let publisher =
            TwitterPublisher::with_endpoints(&credentials(), server.uri(), server.uri()).unwrap();
        publisher.publish(&info(), image.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_failure_skips_status_update() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .respond_with(ResponseTemplate::new(403).set_body_string("media forbidden"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/1.1/statuses/update.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let image = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(image.path(), b"img").unwrap();

        let publisher =
            TwitterPublisher::with_endpoints(&credentials(), server.uri(), server.uri()).unwrap();
        let err = publisher.publish(&info(), image.path()).await.unwrap_err();
        assert!(matches!(
            err,
            SocialPublishError::MediaUpload { status: 403, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_media_id_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let image = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(image.path(), b"img").unwrap();

        let publisher =
            TwitterPublisher::with_endpoints(&credentials(), server.uri(), server.uri()).unwrap();
        let err = publisher.publish(&info(), image.path()).await.unwrap_err();
        assert!(matches!(err, SocialPublishError::MissingMediaId));
    }
}
