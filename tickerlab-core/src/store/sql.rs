//! sqlx-backed ticker store.
//!
//! Uses the `Any` driver so the same statements run against Postgres in
//! production and SQLite for local runs and tests. The store owns a
//! single-threaded tokio runtime and blocks on each statement, keeping the
//! ingestion pipeline synchronous.
//!
//! Transactions are opened lazily: the first upsert after a commit or
//! rollback issues `BEGIN`.

use super::{StoreError, TickerStore};
use crate::resolve::TickerRecord;
use sqlx::AnyConnection;
use sqlx::Connection;
use std::future::Future;
use tracing::{debug, info};

/// Insert-or-update keyed by `symbol`. `region` is write-once.
pub const UPSERT_TICKER: &str = r#"
INSERT INTO tickers (symbol, name, exchange, currency, region, active, last_seen)
VALUES ($1, $2, $3, $4, $5, TRUE, CURRENT_TIMESTAMP)
ON CONFLICT (symbol) DO UPDATE SET
    name = EXCLUDED.name,
    exchange = EXCLUDED.exchange,
    currency = EXCLUDED.currency,
    active = TRUE,
    last_seen = CURRENT_TIMESTAMP
"#;

/// Table layout the upsert expects. Used by tests and local SQLite setups;
/// production schemas are managed outside this tool.
pub const CREATE_TICKERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tickers (
    symbol TEXT PRIMARY KEY,
    name TEXT,
    exchange TEXT,
    currency TEXT,
    region TEXT NOT NULL,
    active BOOLEAN NOT NULL DEFAULT FALSE,
    last_seen TIMESTAMP
)
"#;

pub struct SqlTickerStore {
    runtime: tokio::runtime::Runtime,
    conn: Option<AnyConnection>,
    in_transaction: bool,
}

impl SqlTickerStore {
    /// Connect to `url` (`postgres://...`, `sqlite::memory:`, ...).
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::Runtime(e.to_string()))?;
        let conn = runtime.block_on(AnyConnection::connect(url))?;
        info!(backend = conn.backend_name(), "connected to ticker store");
        Ok(Self {
            runtime,
            conn: Some(conn),
            in_transaction: false,
        })
    }

    /// Run arbitrary DDL/DML outside the upsert path (schema setup in tests).
    pub fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        self.with_conn(|conn| async move {
            let done = sqlx::raw_sql(sql).execute(conn).await?;
            Ok(done.rows_affected())
        })
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn with_conn<'c, F, Fut, T>(&'c mut self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&'c mut AnyConnection) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let conn = self.conn.as_mut().ok_or(StoreError::Closed)?;
        self.runtime.block_on(f(conn))
    }

    fn raw(&mut self, statement: &'static str) -> Result<(), StoreError> {
        self.with_conn(|conn| async move {
            sqlx::raw_sql(statement).execute(conn).await?;
            Ok(())
        })
    }
}

impl TickerStore for SqlTickerStore {
    fn upsert(&mut self, record: &TickerRecord) -> Result<(), StoreError> {
        if !self.in_transaction {
            self.raw("BEGIN")?;
            self.in_transaction = true;
        }
        self.with_conn(|conn| async move {
            sqlx::query(UPSERT_TICKER)
                .bind(record.symbol.as_str())
                .bind(record.name.clone())
                .bind(record.exchange.clone())
                .bind(record.currency.clone())
                .bind(record.region.as_str())
                .execute(conn)
                .await?;
            Ok(())
        })
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.raw("COMMIT")?;
        self.in_transaction = false;
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.raw("ROLLBACK")?;
        debug!("transaction rolled back");
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let conn = self.conn.take().ok_or(StoreError::Closed)?;
        self.in_transaction = false;
        self.runtime.block_on(conn.close())?;
        info!("ticker store connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Row = (Option<String>, Option<String>, Option<String>, String, i64);

    fn memory_store() -> SqlTickerStore {
        let mut store = SqlTickerStore::connect("sqlite::memory:").unwrap();
        store.execute(CREATE_TICKERS_TABLE).unwrap();
        store
    }

    fn fetch_row(store: &mut SqlTickerStore, symbol: &str) -> Option<Row> {
        let symbol = symbol.to_string();
        store
            .with_conn(|conn| async move {
                let row = sqlx::query_as::<_, Row>(
                    "SELECT name, exchange, currency, region, CAST(active AS INTEGER) \
                     FROM tickers WHERE symbol = $1",
                )
                .bind(symbol)
                .fetch_optional(conn)
                .await?;
                Ok(row)
            })
            .unwrap()
    }

    fn count(store: &mut SqlTickerStore) -> i64 {
        store
            .with_conn(|conn| async move {
                let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickers")
                    .fetch_one(conn)
                    .await?;
                Ok(n)
            })
            .unwrap()
    }

    fn record(symbol: &str, name: &str) -> TickerRecord {
        TickerRecord {
            symbol: symbol.into(),
            name: Some(name.into()),
            exchange: Some("NMS".into()),
            currency: Some("USD".into()),
            region: "US".into(),
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = memory_store();
        let aapl = record("AAPL", "Apple Inc.");

        store.upsert(&aapl).unwrap();
        store.commit().unwrap();
        let first = fetch_row(&mut store, "AAPL").unwrap();

        store.upsert(&aapl).unwrap();
        store.commit().unwrap();
        let second = fetch_row(&mut store, "AAPL").unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&mut store), 1);
        assert_eq!(second.4, 1);
    }

    #[test]
    fn conflict_updates_metadata_but_not_region() {
        let mut store = memory_store();
        store.upsert(&record("MSFT", "Microsoft")).unwrap();
        store.commit().unwrap();

        let mut renamed = record("MSFT", "Microsoft Corporation");
        renamed.currency = None;
        renamed.region = "EU".into();
        store.upsert(&renamed).unwrap();
        store.commit().unwrap();

        let (name, exchange, currency, region, active) = fetch_row(&mut store, "MSFT").unwrap();
        assert_eq!(name.as_deref(), Some("Microsoft Corporation"));
        assert_eq!(exchange.as_deref(), Some("NMS"));
        assert_eq!(currency, None);
        assert_eq!(region, "US");
        assert_eq!(active, 1);
    }

    #[test]
    fn upsert_reactivates_inactive_rows() {
        let mut store = memory_store();
        store.upsert(&record("IBM", "IBM")).unwrap();
        store.commit().unwrap();
        store
            .execute("UPDATE tickers SET active = FALSE WHERE symbol = 'IBM'")
            .unwrap();
        assert_eq!(fetch_row(&mut store, "IBM").unwrap().4, 0);

        store.upsert(&record("IBM", "IBM")).unwrap();
        store.commit().unwrap();
        assert_eq!(fetch_row(&mut store, "IBM").unwrap().4, 1);
    }

    #[test]
    fn rollback_discards_uncommitted_upserts() {
        let mut store = memory_store();
        store.upsert(&record("AAPL", "Apple")).unwrap();
        store.commit().unwrap();

        store.upsert(&record("MSFT", "Microsoft")).unwrap();
        assert!(store.in_transaction());
        store.rollback().unwrap();
        assert!(!store.in_transaction());

        assert!(fetch_row(&mut store, "AAPL").is_some());
        assert!(fetch_row(&mut store, "MSFT").is_none());
    }

    #[test]
    fn commit_and_rollback_without_transaction_are_noops() {
        let mut store = memory_store();
        store.commit().unwrap();
        store.rollback().unwrap();
        assert_eq!(count(&mut store), 0);
    }

    #[test]
    fn closed_store_rejects_calls() {
        let mut store = memory_store();
        store.close().unwrap();
        assert!(matches!(
            store.upsert(&record("AAPL", "Apple")),
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn upsert_into_missing_table_fails() {
        let mut store = SqlTickerStore::connect("sqlite::memory:").unwrap();
        assert!(matches!(
            store.upsert(&record("AAPL", "Apple")),
            Err(StoreError::Database(_))
        ));
        store.rollback().unwrap();
    }
}
