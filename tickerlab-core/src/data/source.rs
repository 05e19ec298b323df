//! Ticker sources: where the ingestion loop gets its symbol list.
//!
//! - [`LocalFileSource`] reads a curated symbols file.
//! - [`RemoteTickerSource`] asks a [`TickerListProvider`] and retries with a
//!   linearly growing backoff (`backoff_base * attempt`).

use super::provider::{DataError, TickerListProvider};
use super::symbols_file::read_symbols_file;
use crate::config::{RetryConfig, MAX_DELAY_SECS};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// A supplier of the run's symbol list.
pub trait TickerSource {
    /// Short description for log lines.
    fn describe(&self) -> String;

    /// Sorted, deduplicated symbols.
    fn symbols(&self) -> Result<Vec<String>, DataError>;
}

/// Abstracts `thread::sleep` so retry timing can be asserted in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);

    /// Whether retrying should stop early. Checked after each backoff.
    fn cancelled(&self) -> bool {
        false
    }
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Symbols from a local file.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TickerSource for LocalFileSource {
    fn describe(&self) -> String {
        format!("symbols file {}", self.path.display())
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        read_symbols_file(&self.path)
    }
}

/// Symbols from a remote ticker-list provider, with retry and backoff.
pub struct RemoteTickerSource<P, S = ThreadSleeper> {
    provider: P,
    retry: RetryConfig,
    sleeper: S,
}

impl<P: TickerListProvider> RemoteTickerSource<P, ThreadSleeper> {
    pub fn new(provider: P, retry: RetryConfig) -> Self {
        Self {
            provider,
            retry,
            sleeper: ThreadSleeper,
        }
    }
}

impl<P: TickerListProvider, S: Sleeper> RemoteTickerSource<P, S> {
    pub fn with_sleeper(provider: P, retry: RetryConfig, sleeper: S) -> Self {
        Self {
            provider,
            retry,
            sleeper,
        }
    }

    /// Delay after the given 1-based failed attempt, at most `MAX_DELAY_SECS`.
    /// Negative or NaN bases do not wait.
    fn backoff(&self, attempt: u32) -> Duration {
        let secs = self.retry.backoff_base_secs * f64::from(attempt);
        Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
    }
}

impl<P: TickerListProvider, S: Sleeper> TickerSource for RemoteTickerSource<P, S> {
    fn describe(&self) -> String {
        format!("remote provider {}", self.provider.name())
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            match self.provider.fetch_tickers() {
                Ok(raw) => {
                    let symbols: BTreeSet<String> = raw
                        .iter()
                        .map(|s| s.trim())
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    info!(
                        provider = self.provider.name(),
                        attempt,
                        count = symbols.len(),
                        "fetched ticker list"
                    );
                    return Ok(symbols.into_iter().collect());
                }
                Err(e) => {
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "ticker list fetch failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt == max_attempts {
                break;
            }
            self.sleeper.sleep(self.backoff(attempt));
            if self.sleeper.cancelled() {
                warn!(provider = self.provider.name(), attempt, "ticker list retries cancelled");
                break;
            }
        }

        Err(DataError::TickerFetchExhausted {
            provider: self.provider.name().to_string(),
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".into()),
        })
    }
}
