//! Configuration types for moebot

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Content source configuration (Reddit application credentials)
///
/// Groups settings for retrieving random submissions.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Reddit application client id
    pub client_id: String,

    /// Reddit application client secret
    pub client_secret: String,

    /// Subreddit to pull random submissions from (default: "awwnime")
    #[serde(default = "default_subreddit")]
    pub subreddit: String,

    /// User-Agent header sent to the source API (default: "moebot/0.1")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Chat webhook configuration (Discord)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Discord webhook URL to post submissions to
    pub webhook_url: String,
}

/// Social media configuration (Twitter OAuth 1.0a credentials)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Twitter consumer key
    pub consumer_key: String,

    /// Twitter consumer secret
    pub consumer_secret: String,

    /// Twitter access token
    pub access_token: String,

    /// Twitter access token secret
    pub access_token_secret: String,
}

/// Schedule configuration
///
/// The bot fires once at the top of every hour in the configured timezone.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone name the hourly tick is evaluated in
    /// (default: "America/New_York")
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Retrieval and download behavior configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of structurally-invalid submissions tolerated per
    /// invocation before giving up (default: 5)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP timeout for the image download, in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FetchConfig {
    /// HTTP timeout for the image download as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Main configuration for moebot
///
/// Fields are organized into logical sub-configs:
/// - [`source`](SourceConfig) — content source credentials
/// - [`chat`](ChatConfig) — chat webhook target
/// - [`social`](SocialConfig) — social media credentials
/// - [`schedule`](ScheduleConfig) — scheduler timezone
/// - [`fetch`](FetchConfig) — retry ceiling and download timeout
///
/// Loaded once at startup and passed by reference afterward; there is no
/// ambient global configuration state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Content source credentials and subreddit
    pub source: SourceConfig,

    /// Chat webhook target
    pub chat: ChatConfig,

    /// Social media credentials
    pub social: SocialConfig,

    /// Scheduler timezone
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Retry ceiling and download timeout
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file cannot be read, and
    /// [`Error::Serialization`] if it is not valid JSON for this schema.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.source.client_id.is_empty() {
            return Err(Error::Config {
                message: "source.client_id must not be empty".to_string(),
                key: Some("source.client_id".to_string()),
            });
        }
        if self.chat.webhook_url.is_empty() {
            return Err(Error::Config {
                message: "chat.webhook_url must not be empty".to_string(),
                key: Some("chat.webhook_url".to_string()),
            });
        }
        if self.schedule.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(Error::Config {
                message: format!("unknown timezone: {}", self.schedule.timezone),
                key: Some("schedule.timezone".to_string()),
            });
        }
        Ok(())
    }

    /// The scheduler timezone, parsed
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the timezone name is not a valid IANA
    /// identifier (callers that went through [`Config::load`] never hit this).
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.schedule.timezone.parse().map_err(|_| Error::Config {
            message: format!("unknown timezone: {}", self.schedule.timezone),
            key: Some("schedule.timezone".to_string()),
        })
    }
}

fn default_subreddit() -> String {
    "awwnime".to_string()
}

fn default_user_agent() -> String {
    "moebot/0.1".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "source": {
                "client_id": "id",
                "client_secret": "secret"
            },
            "chat": {
                "webhook_url": "https://discord.example/api/webhooks/1/t"
            },
            "social": {
                "consumer_key": "ck",
                "consumer_secret": "cs",
                "access_token": "at",
                "access_token_secret": "ats"
            }
        })
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(config.schedule.timezone, "America/New_York");
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.source.subreddit, "awwnime");
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let mut json = minimal_json();
        json["schedule"] = serde_json::json!({ "timezone": "Mars/Olympus_Mons" });
        let config: Config = serde_json::from_value(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(k), .. } if k == "schedule.timezone"));
    }

    #[test]
    fn test_empty_webhook_url_rejected() {
        let mut json = minimal_json();
        json["chat"]["webhook_url"] = serde_json::json!("");
        let config: Config = serde_json::from_value(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timezone_parses() {
        let config: Config = serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
    }
}
