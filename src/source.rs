//! Content source client for retrieving random submissions.
//!
//! This module provides the [`ContentSource`] trait — the seam the
//! orchestrator is tested through — and [`RedditSource`], the production
//! implementation. `RedditSource` authenticates with Reddit's application-only
//! OAuth2 flow (`client_credentials`), caches the bearer token until shortly
//! before expiry, and pulls one random submission per call.

use crate::config::SourceConfig;
use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Display metadata for one retrieved submission
///
/// The metadata is passed through unmodified to both publish targets. The
/// image URL is optional; submissions without one fail the orchestrator's
/// validity check and consume a retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostInfo {
    /// Submission title
    pub title: String,

    /// Submission author (without the `u/` prefix)
    pub author: String,

    /// Canonical link to the submission itself
    pub post_url: String,

    /// Direct image URL, if the submission carries one
    pub image: Option<String>,
}

/// A source of candidate submissions
///
/// Retrieval may suspend on network I/O and may retry internally; from the
/// orchestrator's perspective one call yields one candidate. Transport or
/// protocol failures propagate as [`SourceError`] and abort the invocation —
/// they do not count against the retry ceiling.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Retrieve one candidate submission with its display metadata
    async fn get_submission(&self) -> Result<PostInfo, SourceError>;
}

/// Cached app-only bearer token
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Content source backed by Reddit's public API
///
/// Uses the application-only OAuth2 grant: the client id/secret are exchanged
/// for a bearer token which is cached and refreshed 60 seconds before expiry.
pub struct RedditSource {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    subreddit: String,
    auth_base: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl RedditSource {
    /// Create a new Reddit source from configuration
    ///
    /// # Errors
    /// Returns [`SourceError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Self::with_endpoints(
            config,
            "https://www.reddit.com".to_string(),
            "https://oauth.reddit.com".to_string(),
        )
    }

    /// Create a Reddit source against explicit endpoints
    ///
    /// Used by tests to point the client at a local mock server.
    ///
    /// # Errors
    /// Returns [`SourceError::Transport`] if the HTTP client cannot be built.
    pub fn with_endpoints(
        config: &SourceConfig,
        auth_base: String,
        api_base: String,
    ) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            subreddit: config.subreddit.clone(),
            auth_base,
            api_base,
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, refreshing it if missing or near expiry
    async fn bearer_token(&self) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref()
            && cached.expires_at > Utc::now()
        {
            return Ok(cached.value.clone());
        }

        debug!("Requesting new app-only access token");
        let response = self
            .http_client
            .post(format!("{}/api/v1/access_token", self.auth_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::AuthFailed {
                status: status.as_u16(),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("token response: {}", e)))?;

        // Refresh 60 seconds early so an in-flight request never carries an
        // expired token.
        let expires_at = Utc::now() + Duration::seconds((token.expires_in - 60).max(0));
        let value = token.access_token.clone();
        *guard = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });

        info!("Obtained new source access token");
        Ok(value)
    }

    /// Extract submission metadata from the `/random` response body
    ///
    /// The endpoint returns either a single listing or an array of listings
    /// (submission first, comments second); both shapes are accepted.
    fn parse_submission(body: &serde_json::Value) -> Result<PostInfo, SourceError> {
        let listing = match body {
            serde_json::Value::Array(listings) => listings
                .first()
                .ok_or_else(|| SourceError::Parse("empty listing array".to_string()))?,
            other => other,
        };

        let data = listing
            .pointer("/data/children/0/data")
            .ok_or_else(|| SourceError::Parse("no submission in listing".to_string()))?;

        let title = data
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SourceError::Parse("submission has no title".to_string()))?
            .to_string();

        let author = data
            .get("author")
            .and_then(|v| v.as_str())
            .unwrap_or("[deleted]")
            .to_string();

        let permalink = data
            .get("permalink")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let post_url = format!("https://www.reddit.com{}", permalink);

        let image = data
            .get("url")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(PostInfo {
            title,
            author,
            post_url,
            image,
        })
    }
}

#[async_trait]
impl ContentSource for RedditSource {
    async fn get_submission(&self) -> Result<PostInfo, SourceError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/r/{}/random", self.api_base, self.subreddit);

        debug!(url = %url, "Retrieving random submission");
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("listing response: {}", e)))?;

        Self::parse_submission(&body)
    }
}
