//! Ingestion loop: symbol list → metadata → upsert, with batched commits.
//!
//! Per-symbol failures never abort a run:
//! - a failed lookup is skipped like a symbol with no metadata
//! - a failed upsert rolls back the open transaction and the loop moves on
//! - a failed commit rolls back and the loop moves on
//!
//! Only an interruption ends the loop early, after a best-effort commit.
//! A rollback also throws away earlier upserts in the same uncommitted batch;
//! those are counted in [`IngestSummary::discarded`].

pub mod interrupt;

pub use interrupt::Interrupt;

use crate::config::{ConfigError, IngestConfig};
use crate::data::provider::{DataError, MetadataProvider};
use crate::data::source::TickerSource;
use crate::resolve::{MetadataResolver, Resolution, TickerRecord};
use crate::store::{StoreError, TickerStore};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ticker source failed: {0}")]
    Source(#[from] DataError),

    #[error("ticker store failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("set the POSTGRES_URL environment variable or run with --dry-run")]
    MissingDatabaseUrl,

    #[error("interrupted after {processed}/{total} symbols")]
    Interrupted { processed: usize, total: usize },
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub total: usize,
    pub processed: usize,
    /// Successful upserts (or would-be upserts in dry-run mode).
    pub upserted: usize,
    /// Symbols without common-stock metadata.
    pub skipped: usize,
    pub upsert_failures: Vec<String>,
    pub commits: usize,
    pub commit_failures: usize,
    /// Successful upserts lost to a rollback before they were committed.
    pub discarded: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestSummary {
    fn new(total: usize, dry_run: bool) -> Self {
        Self {
            total,
            processed: 0,
            upserted: 0,
            skipped: 0,
            upsert_failures: Vec::new(),
            commits: 0,
            commit_failures: 0,
            discarded: 0,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether every resolved symbol made it into a committed transaction.
    pub fn is_clean(&self) -> bool {
        self.upsert_failures.is_empty() && self.commit_failures == 0 && self.discarded == 0
    }
}

/// Drives one ingestion run.
pub struct Ingestor<'a> {
    config: &'a IngestConfig,
    resolver: MetadataResolver<'a>,
    interrupt: Interrupt,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        config: &'a IngestConfig,
        provider: &'a dyn MetadataProvider,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            config,
            resolver: MetadataResolver::new(provider),
            interrupt,
        }
    }

    /// Full run: fetch symbols, connect (unless dry-run), process, close.
    ///
    /// `connect` receives the configured database URL. The store it returns is
    /// closed before this returns, whatever the outcome.
    pub fn run<C>(&self, source: &dyn TickerSource, connect: C) -> Result<IngestSummary, IngestError>
    where
        C: FnOnce(&str) -> Result<Box<dyn TickerStore>, StoreError>,
    {
        self.config.validate()?;
        let url = match (self.config.dry_run, self.config.database_url.as_deref()) {
            (true, _) => None,
            (false, Some(url)) => Some(url),
            (false, None) => return Err(IngestError::MissingDatabaseUrl),
        };

        let mut symbols = match source.symbols() {
            Ok(symbols) => symbols,
            Err(e) if self.interrupt.is_triggered() => {
                warn!(error = %e, "interrupted while fetching symbols");
                return Err(IngestError::Interrupted {
                    processed: 0,
                    total: 0,
                });
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(limit) = self.config.effective_limit() {
            symbols.truncate(limit);
        }
        info!(
            source = %source.describe(),
            provider = self.resolver.provider_name(),
            total = symbols.len(),
            limit = ?self.config.effective_limit(),
            batch_size = self.config.batch_size,
            "discovered tickers"
        );

        let Some(url) = url else {
            info!("[dry-run] running without database updates");
            return self.process(&symbols, None);
        };

        let mut store = connect(url)?;
        let result = self.process(&symbols, Some(store.as_mut()));
        if let Err(e) = store.close() {
            warn!(error = %e, "failed to close ticker store");
        }
        result
    }

    /// Process an already-fetched symbol list. `store = None` means dry-run.
    pub fn process(
        &self,
        symbols: &[String],
        store: Option<&mut dyn TickerStore>,
    ) -> Result<IngestSummary, IngestError> {
        self.config.validate()?;
        let total = symbols.len();
        let batch_size = self.config.batch_size;
        let progress_every = self.config.progress_interval();
        let delay = self.config.rate_limit()?;

        let mut run = RunState {
            summary: IngestSummary::new(total, store.is_none()),
            store,
            pending: 0,
        };

        for symbol in symbols {
            if self.interrupt.is_triggered() {
                return Err(run.interrupted());
            }

            run.summary.processed += 1;
            match self.resolver.resolve(symbol) {
                Resolution::Resolved(record) => run.upsert(&record),
                other => {
                    debug!(symbol = %symbol, reason = other.skip_reason(), "no common-stock metadata; skipping");
                    run.summary.skipped += 1;
                }
            }

            let processed = run.summary.processed;
            if processed % progress_every == 0 {
                info!(
                    processed,
                    total,
                    upserted = run.summary.upserted,
                    "progress"
                );
            }

            if processed % batch_size == 0 && run.commit() {
                info!(
                    processed,
                    total,
                    upserted = run.summary.upserted,
                    "committed batch"
                );
            }

            if self.interrupt.sleep(delay) {
                return Err(run.interrupted());
            }
        }

        if run.store.is_some() && run.commit() {
            info!("final commit complete");
        }

        Ok(run.finish())
    }
}

/// Mutable state of one pass over the symbol list.
struct RunState<'s> {
    store: Option<&'s mut dyn TickerStore>,
    summary: IngestSummary,
    /// Upserts since the last commit or rollback.
    pending: usize,
}

impl RunState<'_> {
    fn upsert(&mut self, record: &TickerRecord) {
        let Some(store) = self.store.as_deref_mut() else {
            info!(symbol = %record.symbol, name = ?record.name, "[dry-run] would upsert");
            self.summary.upserted += 1;
            return;
        };

        match store.upsert(record) {
            Ok(()) => {
                self.summary.upserted += 1;
                self.pending += 1;
            }
            Err(e) => {
                error!(
                    symbol = %record.symbol,
                    name = ?record.name,
                    exchange = ?record.exchange,
                    error = %e,
                    "upsert failed; rolling back and continuing"
                );
                self.summary.upsert_failures.push(record.symbol.clone());
                self.rollback();
            }
        }
    }

    /// Commit pending work. Returns `true` if a commit was issued and succeeded.
    fn commit(&mut self) -> bool {
        let Some(store) = self.store.as_deref_mut() else {
            return false;
        };

        match store.commit() {
            Ok(()) => {
                self.summary.commits += 1;
                self.pending = 0;
                true
            }
            Err(e) => {
                error!(
                    processed = self.summary.processed,
                    error = %e,
                    "commit failed; rolling back"
                );
                self.summary.commit_failures += 1;
                self.rollback();
                false
            }
        }
    }

    fn rollback(&mut self) {
        let Some(store) = self.store.as_deref_mut() else {
            return;
        };

        if let Err(e) = store.rollback() {
            error!(error = %e, "rollback failed");
        }
        if self.pending > 0 {
            warn!(
                discarded = self.pending,
                "rollback discarded uncommitted upserts from this batch"
            );
            self.summary.discarded += self.pending;
            self.pending = 0;
        }
    }

    fn interrupted(mut self) -> IngestError {
        warn!(
            processed = self.summary.processed,
            total = self.summary.total,
            "interrupted; attempting to commit pending changes"
        );
        if self.store.is_some() && self.commit() {
            info!("committed pending work after interrupt");
        }
        let summary = self.finish();
        IngestError::Interrupted {
            processed: summary.processed,
            total: summary.total,
        }
    }

    fn finish(mut self) -> IngestSummary {
        self.summary.finished_at = Some(Utc::now());
        let s = &self.summary;
        info!(
            upserted = s.upserted,
            skipped = s.skipped,
            upsert_failures = s.upsert_failures.len(),
            commit_failures = s.commit_failures,
            discarded = s.discarded,
            dry_run = s.dry_run,
            "inserted/updated {} common stocks",
            s.upserted
        );
        if !s.upsert_failures.is_empty() {
            warn!(symbols = ?s.upsert_failures, "symbols to retry manually");
        }
        self.summary
    }
}
