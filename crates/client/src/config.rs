//! Client and polling configuration loaded from environment variables.
//!
//! Values are read once at process start and passed into constructors
//! explicitly. Nothing in this crate reads the environment on its own.

use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Default per-request timeout enforced by the HTTP transport.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default cadence between successful status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default number of consecutive transient failures tolerated.
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default wall-clock ceiling for one polling session (10 minutes).
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Connection settings for the agent execution service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, without a trailing slash.
    pub base_url: String,
    /// Bearer credential sent on every request.
    pub api_token: String,
    pub account_id: String,
    pub agent_id: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            account_id: account_id.into(),
            agent_id: agent_id.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `AGENT_API_BASE_URL`         | --      |
    /// | `AGENT_API_TOKEN`            | --      |
    /// | `AGENT_ACCOUNT_ID`           | --      |
    /// | `AGENT_ID`                   | --      |
    /// | `AGENT_REQUEST_TIMEOUT_SECS` | `30`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let mut config = Self::new(
            required("AGENT_API_BASE_URL")?,
            required("AGENT_API_TOKEN")?,
            required("AGENT_ACCOUNT_ID")?,
            required("AGENT_ID")?,
        );
        config.request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "AGENT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        Ok(config)
    }
}

/// Tunables for one polling session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Wait between successful polls of a job that is not yet terminal.
    pub poll_interval: Duration,
    /// Consecutive transient failures tolerated before giving up.
    pub max_retries: u32,
    /// Hard ceiling on total session lifetime.
    pub session_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            session_timeout: Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Load overrides from the environment; unset variables keep defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `AGENT_POLL_INTERVAL_SECS`   | `5`     |
    /// | `AGENT_MAX_RETRIES`          | `5`     |
    /// | `AGENT_SESSION_TIMEOUT_SECS` | `600`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "AGENT_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            max_retries: parse_or(&lookup, "AGENT_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            session_timeout: Duration::from_secs(parse_or(
                &lookup,
                "AGENT_SESSION_TIMEOUT_SECS",
                DEFAULT_SESSION_TIMEOUT_SECS,
            )?),
            backoff: BackoffPolicy::default(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a non-negative integer",
            value: raw,
        }),
    }
}
