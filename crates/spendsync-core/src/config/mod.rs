//! Sync configuration.
//!
//! Values come from the environment (`SPENDSYNC_*`), or are built in code with
//! the `with_*` helpers.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for talking to the remote store.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the remote API (e.g., `https://api.example.com`)
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Background sync interval (`None` for manual sync only)
    pub sync_interval: Option<Duration>,
    /// Consecutive push failures after which a record is reported as stuck
    pub failure_warn_threshold: u32,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("sync_interval", &self.sync_interval)
            .field("failure_warn_threshold", &self.failure_warn_threshold)
            .finish()
    }
}

impl SyncConfig {
    /// Create a configuration for the given API base URL with default tuning.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(api_base_url.into())?;
        Ok(Self {
            api_base_url,
            auth_token: None,
            request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            sync_interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
        })
    }

    /// Load configuration from `SPENDSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_text_option(lookup("SPENDSYNC_API_URL"))
            .ok_or(ConfigError::MissingVar("SPENDSYNC_API_URL"))?;
        let mut config = Self::new(api_base_url)?;
        config.auth_token = normalize_text_option(lookup("SPENDSYNC_API_TOKEN"));

        if let Some(raw) = normalize_text_option(lookup("SPENDSYNC_HTTP_TIMEOUT_SECS")) {
            let secs = raw.parse::<u64>().ok().filter(|secs| {
                (1..=MAX_HTTP_TIMEOUT_SECS).contains(secs)
            });
            let secs = secs.ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "SPENDSYNC_HTTP_TIMEOUT_SECS must be an integer in [1, {MAX_HTTP_TIMEOUT_SECS}]"
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = normalize_text_option(lookup("SPENDSYNC_SYNC_INTERVAL_SECS")) {
            let secs = raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(
                    "SPENDSYNC_SYNC_INTERVAL_SECS must be a non-negative integer".to_string(),
                )
            })?;
            config.sync_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = normalize_text_option(lookup("SPENDSYNC_FAILURE_WARN_THRESHOLD")) {
            config.failure_warn_threshold =
                raw.parse::<u32>().ok().filter(|value| *value > 0).ok_or_else(|| {
                    ConfigError::Invalid(
                        "SPENDSYNC_FAILURE_WARN_THRESHOLD must be a positive integer".to_string(),
                    )
                })?;
        }

        Ok(config)
    }

    /// Set the bearer token used for remote requests
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    /// Set the per-request HTTP timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the automatic sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Disable automatic sync (manual sync only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    #[must_use]
    pub const fn with_failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = threshold;
        self
    }
}

fn normalize_base_url(raw: String) -> Result<String, ConfigError> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| ConfigError::Invalid("API base URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::Invalid(
            "API base URL must start with http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(map: &HashMap<&str, &str>) -> Result<SyncConfig, ConfigError> {
        SyncConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_api_url() {
        let err = from_map(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("SPENDSYNC_API_URL"));
    }

    #[test]
    fn config_applies_defaults() {
        let map = HashMap::from([("SPENDSYNC_API_URL", "https://api.example.com/")]);
        let config = from_map(&map).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.sync_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.failure_warn_threshold, 5);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn zero_interval_disables_auto_sync() {
        let map = HashMap::from([
            ("SPENDSYNC_API_URL", "http://localhost:3000"),
            ("SPENDSYNC_SYNC_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(from_map(&map).unwrap().sync_interval, None);
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        let map = HashMap::from([
            ("SPENDSYNC_API_URL", "http://localhost:3000"),
            ("SPENDSYNC_HTTP_TIMEOUT_SECS", "0"),
        ]);
        assert!(from_map(&map).is_err());

        let map = HashMap::from([("SPENDSYNC_API_URL", "localhost:3000")]);
        assert!(from_map(&map).is_err());
    }

    #[test]
    fn config_redacts_token_in_debug() {
        let map = HashMap::from([
            ("SPENDSYNC_API_URL", "https://api.example.com"),
            ("SPENDSYNC_API_TOKEN", "sensitive-token"),
        ]);
        let config = from_map(&map).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
