//! Configuration module for the UniDB client.
//!
//! Configuration is loaded from environment variables with sensible defaults,
//! or built explicitly with [`Config::new`] and handed to the client.

use std::env;
use std::time::Duration;

use crate::errors::ClientError;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// UniDB host, e.g. `https://unidb.example.com/api`
    pub base_url: String,
    /// Contract key that scopes every table path
    pub contract_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Append a `t=<millis>` token to list requests so intermediaries never serve stale tables
    pub cache_bust: bool,
    /// Interval used by the periodic refresh task
    pub refresh_interval: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of plain text
    pub log_json: bool,
}

impl Config {
    /// Build a configuration pointing at `base_url`/`contract_key` with default tuning.
    pub fn new(base_url: impl Into<String>, contract_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            contract_key: contract_key.into(),
            request_timeout: Duration::from_secs(15),
            cache_bust: true,
            refresh_interval: Duration::from_secs(30),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();

        let base_url = env::var("UNIDB_BASE_URL")
            .map_err(|_| ClientError::Config("UNIDB_BASE_URL is not set".to_string()))?;
        let contract_key = env::var("UNIDB_CONTRACT_KEY")
            .map_err(|_| ClientError::Config("UNIDB_CONTRACT_KEY is not set".to_string()))?;

        let mut config = Self::new(base_url, contract_key);

        if let Ok(raw) = env::var("UNIDB_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_secs("UNIDB_TIMEOUT_SECS", &raw)?);
        }
        if let Ok(raw) = env::var("UNIDB_REFRESH_INTERVAL_SECS") {
            config.refresh_interval =
                Duration::from_secs(parse_secs("UNIDB_REFRESH_INTERVAL_SECS", &raw)?);
        }
        if let Ok(raw) = env::var("UNIDB_CACHE_BUST") {
            config.cache_bust = parse_flag(&raw);
        }
        if let Ok(level) = env::var("UNIDB_LOG_LEVEL") {
            config.log_level = level;
        }
        config.log_json = env::var("UNIDB_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Root of every data path: `{base_url}/{contract_key}`.
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.contract_key.trim_matches('/')
        )
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64, ClientError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| ClientError::Config(format!("{} must be a positive integer", name)))
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
