//! Serializable ingestion configuration.
//!
//! Built once at process start (TOML file → environment → CLI overrides) and
//! passed down explicitly; nothing below the entry point reads the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the database connection string.
pub const DATABASE_URL_ENV: &str = "POSTGRES_URL";

pub const DEFAULT_RATE_LIMIT_SECS: f64 = 0.4;
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Upper bound for `rate_limit_secs` and `retry.backoff_base_secs`.
pub const MAX_DELAY_SECS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Retry policy for the remote ticker-list fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep after failed attempt `n` is `backoff_base_secs * n`.
    pub backoff_base_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 1.0,
        }
    }
}

/// Everything the ingestion run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Resolve and log, but never connect to the database.
    pub dry_run: bool,
    /// Cap on processed symbols; 0 means no cap.
    pub limit: Option<usize>,
    /// Seconds to wait after each symbol.
    pub rate_limit_secs: f64,
    /// Read symbols from this file instead of the remote provider.
    pub symbols_file: Option<PathBuf>,
    /// Commit every this many processed symbols.
    pub batch_size: usize,
    /// Connection string; falls back to `POSTGRES_URL`.
    pub database_url: Option<String>,
    pub retry: RetryConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            limit: None,
            rate_limit_secs: DEFAULT_RATE_LIMIT_SECS,
            symbols_file: None,
            batch_size: DEFAULT_BATCH_SIZE,
            database_url: None,
            retry: RetryConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Fill `database_url` from the environment lookup if not already set.
    ///
    /// Takes the lookup as a closure so callers decide where values come from.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.database_url.is_none() {
            self.database_url = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty());
        }
        self
    }

    /// Progress is logged every `ceil(batch_size / 10)` processed symbols.
    pub fn progress_interval(&self) -> usize {
        self.batch_size.div_ceil(10).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        check_delay("rate_limit_secs", self.rate_limit_secs)?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        check_delay("retry.backoff_base_secs", self.retry.backoff_base_secs)?;
        Ok(())
    }

    /// The symbol cap, if any. A limit of 0 means no limit.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }

    /// Pause after each symbol.
    pub fn rate_limit(&self) -> Result<Duration, ConfigError> {
        check_delay("rate_limit_secs", self.rate_limit_secs)
    }
}

/// Seconds in `0..=MAX_DELAY_SECS`, as a `Duration`.
fn check_delay(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be between 0 and {MAX_DELAY_SECS} seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::Invalid(format!("{name}: {e}")))
}
