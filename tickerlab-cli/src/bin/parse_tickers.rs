//! `parse-tickers`: turn the Nasdaq traded-symbol directory into a symbols file.
//!
//! ETFs, test issues, share classes (`.`) and index symbols (`^`) are dropped.
//! The result can be fed to `ingest-tickers --symbols-file`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tickerlab_core::data::{extract_with_filter, load_feed, write_symbols_file};
use tickerlab_core::logging::{self, LogConfig};
use tracing::{error, info};

const DEFAULT_SOURCE: &str = "https://ftp.nasdaqtrader.com/dynamic/SymDir/nasdaqtraded.txt";
const DEFAULT_OUTPUT_NAME: &str = "symbols.txt";

#[derive(Parser)]
#[command(
    name = "parse-tickers",
    about = "Extract common-stock symbols from a Nasdaq symbol directory feed"
)]
struct Cli {
    /// Feed location: a local path or an http(s) URL.
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,

    /// Output file. Defaults to symbols.txt next to this executable.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&LogConfig::from_env().with_verbosity(cli.verbose));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let output = match &cli.output {
        Some(path) => path.clone(),
        None => default_output()?,
    };

    let table = load_feed(&cli.source).with_context(|| format!("loading {}", cli.source))?;
    let (symbols, filter) = extract_with_filter(&table)
        .with_context(|| format!("extracting symbols from {}", cli.source))?;
    info!(filter = ?filter, count = symbols.len(), "extracted symbols");

    write_symbols_file(&output, &symbols)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {} tickers to {}", symbols.len(), output.display());
    Ok(())
}

fn default_output() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("locating executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(dir.join(DEFAULT_OUTPUT_NAME))
}
