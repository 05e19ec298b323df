//! Persistence gateway for the `tickers` table.
//!
//! The ingestion loop only talks to [`TickerStore`]; the SQL implementation
//! lives in [`sql`].

pub mod sql;

use crate::resolve::TickerRecord;
use thiserror::Error;

pub use sql::{SqlTickerStore, CREATE_TICKERS_TABLE, UPSERT_TICKER};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("connection already closed")]
    Closed,

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Transactional upsert sink for ticker records.
///
/// Writes are buffered in a transaction until [`commit`](TickerStore::commit);
/// [`rollback`](TickerStore::rollback) discards everything since the last commit.
pub trait TickerStore {
    /// Insert or update the row keyed by `record.symbol`, marking it active.
    fn upsert(&mut self, record: &TickerRecord) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Release the connection. Further calls fail with [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;
}
