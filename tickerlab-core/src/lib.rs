//! TickerLab Core: symbol feeds, common-stock classification and ticker persistence.
//!
//! This crate contains everything behind the two command-line tools:
//! - Feed loading and symbol extraction from the Nasdaq traded-symbol directory
//! - Ticker sources (local symbols file, remote ticker list with retry/backoff)
//! - Metadata resolution and the "is common stock" rule
//! - The `tickers` table upsert gateway
//! - The ingestion loop with batched commits and interruption handling

pub mod config;
pub mod data;
pub mod ingest;
pub mod logging;
pub mod resolve;
pub mod store;

pub use config::{ConfigError, IngestConfig, RetryConfig};
pub use data::{DataError, FeedTable, QuoteProfile};
pub use ingest::{IngestError, IngestSummary, Ingestor, Interrupt};
pub use resolve::{is_common_stock, MetadataResolver, Resolution, TickerRecord};
pub use store::{SqlTickerStore, StoreError, TickerStore};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: values handed between the loop and its
    /// collaborators stay Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TickerRecord>();
        require_sync::<TickerRecord>();
        require_send::<QuoteProfile>();
        require_sync::<QuoteProfile>();
        require_send::<FeedTable>();
        require_sync::<FeedTable>();
        require_send::<IngestConfig>();
        require_sync::<IngestConfig>();
        require_send::<IngestSummary>();
        require_sync::<IngestSummary>();
        require_send::<Interrupt>();
        require_sync::<Interrupt>();
        require_send::<DataError>();
        require_sync::<DataError>();
    }
}
