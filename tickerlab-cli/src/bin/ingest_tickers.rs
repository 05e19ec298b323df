//! `ingest-tickers`: resolve US common stocks and upsert them into `tickers`.
//!
//! Symbols come from `--symbols-file` or the Nasdaq screener. Each symbol is
//! looked up on Yahoo Finance; only common stocks are written. Requires
//! `POSTGRES_URL` unless running with `--dry-run` or `--dump-symbols`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tickerlab_core::data::{
    write_symbols_file, LocalFileSource, NasdaqScreenerProvider, RemoteTickerSource,
    TickerSource, YahooChartProvider,
};
use tickerlab_core::logging::{self, LogConfig};
use tickerlab_core::store::{SqlTickerStore, TickerStore};
use tickerlab_core::{IngestConfig, IngestError, Ingestor, Interrupt};
use tracing::{error, info, warn};

/// Exit status for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "ingest-tickers",
    about = "Ingest US common-stock tickers into the tickers table"
)]
struct Cli {
    /// Resolve and log without writing to the database.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Process at most N symbols.
    #[arg(long)]
    limit: Option<usize>,

    /// Seconds to wait between symbol lookups.
    #[arg(long)]
    rate_limit: Option<f64>,

    /// Read symbols from this file (one per line) instead of the screener.
    #[arg(long)]
    symbols_file: Option<PathBuf>,

    /// Write the full symbol list to this path and exit.
    #[arg(long)]
    dump_symbols: Option<PathBuf>,

    /// Commit every N processed symbols.
    #[arg(long)]
    batch_size: Option<usize>,

    /// TOML file with ingestion settings. Flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attempts at fetching the remote ticker list.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff in seconds between ticker-list attempts.
    #[arg(long)]
    retry_backoff: Option<f64>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Config file, then environment, then flags.
    fn ingest_config(&self) -> Result<IngestConfig> {
        let base = match &self.config {
            Some(path) => IngestConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => IngestConfig::default(),
        };
        let mut cfg = base.with_env(|key| std::env::var(key).ok());

        cfg.dry_run |= self.dry_run;
        if self.limit.is_some() {
            cfg.limit = self.limit;
        }
        if let Some(secs) = self.rate_limit {
            cfg.rate_limit_secs = secs;
        }
        if self.symbols_file.is_some() {
            cfg.symbols_file = self.symbols_file.clone();
        }
        if let Some(n) = self.batch_size {
            cfg.batch_size = n;
        }
        if let Some(n) = self.max_retries {
            cfg.retry.max_attempts = n;
        }
        if let Some(secs) = self.retry_backoff {
            cfg.retry.backoff_base_secs = secs;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&LogConfig::from_env().with_verbosity(cli.verbose));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<IngestError>() {
            Some(IngestError::Interrupted { processed, total }) => {
                warn!(processed, total, "stopped by user");
                ExitCode::from(EXIT_INTERRUPTED)
            }
            _ => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = cli.ingest_config()?;
    cfg.validate()?;

    let interrupt = Interrupt::new();
    // Held for the whole run; dropping it stops the signal watcher.
    let _signals = watch_ctrl_c(interrupt.clone())?;
    let source = ticker_source(&cfg, &interrupt)?;

    if let Some(path) = &cli.dump_symbols {
        return dump_symbols(source.as_ref(), path, &interrupt);
    }

    let provider = YahooChartProvider::new().context("creating metadata provider")?;
    let summary = Ingestor::new(&cfg, &provider, interrupt).run(source.as_ref(), |url| {
        Ok(Box::new(SqlTickerStore::connect(url)?) as Box<dyn TickerStore>)
    })?;

    if !summary.is_clean() {
        warn!(
            upsert_failures = summary.upsert_failures.len(),
            commit_failures = summary.commit_failures,
            discarded = summary.discarded,
            "run finished with losses; re-run to pick them up"
        );
    }
    Ok(())
}

/// Remote retries back off on `interrupt`, so Ctrl-C cancels them.
fn ticker_source(cfg: &IngestConfig, interrupt: &Interrupt) -> Result<Box<dyn TickerSource>> {
    Ok(match &cfg.symbols_file {
        Some(path) => Box::new(LocalFileSource::new(path)),
        None => {
            let provider =
                NasdaqScreenerProvider::new().context("creating ticker list provider")?;
            Box::new(RemoteTickerSource::with_sleeper(
                provider,
                cfg.retry,
                interrupt.clone(),
            ))
        }
    })
}

/// Full list, ignoring `--limit`; never touches the database.
fn dump_symbols(source: &dyn TickerSource, path: &Path, interrupt: &Interrupt) -> Result<()> {
    let symbols = match source.symbols() {
        Ok(symbols) => symbols,
        Err(_) if interrupt.is_triggered() => {
            return Err(IngestError::Interrupted {
                processed: 0,
                total: 0,
            }
            .into())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("fetching symbols from {}", source.describe()))
        }
    };
    write_symbols_file(path, &symbols)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(count = symbols.len(), path = %path.display(), "dumped symbols");
    println!("Wrote {} tickers to {}", symbols.len(), path.display());
    Ok(())
}

/// Trigger `interrupt` on the first Ctrl-C; exit immediately on the second.
fn watch_ctrl_c(interrupt: Interrupt) -> Result<tokio::runtime::Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("signal-watcher")
        .enable_all()
        .build()
        .context("starting signal watcher")?;

    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received; finishing current symbol (Ctrl-C again to quit now)");
        interrupt.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("second interrupt; exiting without a final commit");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
    Ok(runtime)
}
