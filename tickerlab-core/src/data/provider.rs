//! Provider traits and structured error types for the data layer.
//!
//! The traits abstract over the external systems we read from (the Nasdaq
//! screener, Yahoo Finance) so we can swap implementations and mock for tests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI log lines as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("source unreadable: {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("symbols file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("source does not contain a 'Symbol' column (columns: {columns:?})")]
    MissingSymbolColumn { columns: Vec<String> },

    #[error(
        "failed to fetch tickers from {provider} after {attempts} attempts ({last_error}); \
         pass a local symbols file with --symbols-file to avoid remote fetching"
    )]
    TickerFetchExhausted {
        provider: String,
        attempts: u32,
        last_error: String,
    },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Classification fields a metadata provider reports for one symbol.
///
/// Field names follow the provider-neutral vocabulary used by the resolver;
/// each provider maps its own payload onto this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteProfile {
    /// Instrument class, e.g. `EQUITY`, `ETF`, `MUTUALFUND`.
    pub quote_type: Option<String>,
    /// Equity subtype, e.g. `COMMON`, `PREFERRED`. Most providers omit it.
    pub stock_type: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
}

/// Trait for metadata providers (Yahoo Finance, test doubles).
pub trait MetadataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Look up a symbol. `Ok(None)` means the provider has no data for it.
    fn lookup(&self, symbol: &str) -> Result<Option<QuoteProfile>, DataError>;
}

/// Trait for providers of a full ticker list (Nasdaq screener, test doubles).
pub trait TickerListProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch every ticker the provider knows about, in any order.
    fn fetch_tickers(&self) -> Result<Vec<String>, DataError>;
}

/// Whether a source string names a remote URL rather than a local path.
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Shared blocking HTTP client configuration for all remote sources.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))
}
