//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const ENV_API_BASE: &str = "ANALYSIS_API_BASE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ANALYSIS_REQUEST_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "ANALYSIS_POLL_INTERVAL_MS";
pub const ENV_POLL_INITIAL_DELAY_MS: &str = "ANALYSIS_POLL_INITIAL_DELAY_MS";
pub const ENV_HISTORY_LIMIT: &str = "ANALYSIS_HISTORY_LIMIT";
pub const ENV_MAX_RETRIES: &str = "ANALYSIS_MAX_RETRIES";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for talking to the analysis backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend, e.g. `http://localhost:8000`
    pub api_base: String,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// Delay between poll fetches
    pub poll_interval: Duration,

    /// Delay before the first poll fetch after submission
    pub poll_initial_delay: Duration,

    /// Number of finished jobs kept in the local history
    pub history_limit: usize,

    /// Maximum attempts for idempotent requests
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            poll_initial_delay: Duration::from_secs(1),
            history_limit: 10,
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(100),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through `lookup`, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(base) = lookup(ENV_API_BASE) {
            builder = builder.api_base(base);
        }
        if let Some(secs) = parse_var(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var(&lookup, ENV_POLL_INTERVAL_MS)? {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var(&lookup, ENV_POLL_INITIAL_DELAY_MS)? {
            builder = builder.poll_initial_delay(Duration::from_millis(ms));
        }
        if let Some(limit) = parse_var(&lookup, ENV_HISTORY_LIMIT)? {
            builder = builder.history_limit(limit);
        }
        if let Some(retries) = parse_var(&lookup, ENV_MAX_RETRIES)? {
            builder = builder.max_retries(retries);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval must be greater than 0".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "history_limit must be greater than 0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed base URL, always ending in `/` so relative joins keep any path prefix
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.api_base.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("api_base '{}': {e}", self.api_base)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid(format!(
                "api_base must use http or https, got '{other}'"
            ))),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_base: Option<String>,
    request_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    poll_initial_delay: Option<Duration>,
    history_limit: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    pub fn poll_interval(mut self, duration: Duration) -> Self {
        self.poll_interval = Some(duration);
        self
    }

    pub fn poll_initial_delay(mut self, duration: Duration) -> Self {
        self.poll_initial_delay = Some(duration);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let config = ClientConfig {
            api_base: self.api_base.unwrap_or(defaults.api_base),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            poll_initial_delay: self.poll_initial_delay.unwrap_or(defaults.poll_initial_delay),
            history_limit: self.history_limit.unwrap_or(defaults.history_limit),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
        };

        config.validate()?;
        Ok(config)
    }
}
