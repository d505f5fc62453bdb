//! SDK configuration

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "PREPDECK_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Configuration for the PrepDeck session SDK.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the identity provider endpoint
    pub provider_endpoint: String,

    /// Application client id registered with the provider
    pub client_id: String,

    /// Timeout applied to every provider round trip
    pub request_timeout: Duration,

    /// Remaining access-token lifetime below which a refresh is triggered
    pub refresh_threshold: Duration,

    /// Access-token lifetime assumed when the provider omits one
    pub default_token_lifetime: Duration,

    /// Interval between provider readiness probes
    pub ready_poll_interval: Duration,

    /// Readiness probe attempts before giving up
    pub ready_max_attempts: u32,

    /// Path of the single-slot credential file
    pub credentials_path: PathBuf,

    /// View the route guard redirects unauthenticated callers to
    pub entry_path: String,

    /// User agent string
    pub user_agent: String,
}

impl SessionConfig {
    /// Create a configuration with the given provider endpoint and client id.
    pub fn new(provider_endpoint: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            provider_endpoint: provider_endpoint.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            request_timeout: Duration::from_secs(10),
            refresh_threshold: Duration::from_secs(300),
            default_token_lifetime: Duration::from_secs(3600),
            ready_poll_interval: Duration::from_millis(100),
            ready_max_attempts: 50,
            credentials_path: PathBuf::from(".prepdeck/session.json"),
            entry_path: "/signin".to_string(),
            user_agent: format!("PrepDeck-Session/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load configuration from `PREPDECK_*` environment variables.
    ///
    /// `PREPDECK_PROVIDER_ENDPOINT` and `PREPDECK_CLIENT_ID` are required;
    /// everything else falls back to defaults. Unparseable numeric overrides
    /// are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env_var("PROVIDER_ENDPOINT")
            .ok_or(ConfigError::Missing("PREPDECK_PROVIDER_ENDPOINT"))?;
        let client_id =
            env_var("CLIENT_ID").ok_or(ConfigError::Missing("PREPDECK_CLIENT_ID"))?;

        let mut config = Self::new(endpoint, client_id);

        if let Some(val) = env_var("REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }
        if let Some(val) = env_var("REFRESH_THRESHOLD_SECS") {
            if let Ok(secs) = val.parse() {
                config.refresh_threshold = Duration::from_secs(secs);
            }
        }
        if let Some(val) = env_var("TOKEN_LIFETIME_SECS") {
            if let Ok(secs) = val.parse() {
                config.default_token_lifetime = Duration::from_secs(secs);
            }
        }
        if let Some(val) = env_var("CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(val);
        }
        if let Some(val) = env_var("ENTRY_PATH") {
            config.entry_path = val;
        }

        Ok(config)
    }

    /// Set the provider request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the proactive refresh threshold.
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Set the fallback access-token lifetime.
    pub fn with_default_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_token_lifetime = lifetime;
        self
    }

    /// Set the readiness probe cadence.
    pub fn with_ready_probing(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.ready_poll_interval = interval;
        self.ready_max_attempts = max_attempts;
        self
    }

    /// Set the credential file path.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Set the entry (sign-in) path used by the route guard.
    pub fn with_entry_path(mut self, path: impl Into<String>) -> Self {
        self.entry_path = path.into();
        self
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}"))
        .ok()
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("https://idp.example.com", "client-1");

        assert_eq!(config.provider_endpoint, "https://idp.example.com");
        assert_eq!(config.refresh_threshold, Duration::from_secs(300));
        assert_eq!(config.ready_poll_interval, Duration::from_millis(100));
        assert_eq!(config.ready_max_attempts, 50);
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let config = SessionConfig::new("https://idp.example.com/", "client-1");
        assert_eq!(config.provider_endpoint, "https://idp.example.com");
    }

    #[test]
    fn test_builder_overrides() {
        let config = SessionConfig::new("https://idp.example.com", "client-1")
            .with_refresh_threshold(Duration::from_secs(60))
            .with_ready_probing(Duration::from_millis(10), 3)
            .with_entry_path("/login");

        assert_eq!(config.refresh_threshold, Duration::from_secs(60));
        assert_eq!(config.ready_max_attempts, 3);
        assert_eq!(config.entry_path, "/login");
    }

    #[test]
    fn test_from_env_requires_endpoint() {
        std::env::remove_var("PREPDECK_PROVIDER_ENDPOINT");
        let result = SessionConfig::from_env();
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }
}
