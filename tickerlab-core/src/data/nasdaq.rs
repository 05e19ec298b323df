//! Nasdaq stock screener ticker list.
//!
//! Downloads the screener table for each US exchange and merges the symbols.
//! The endpoint is unofficial and rejects requests without browser-like
//! headers; any non-success status or a payload without `data.rows` is an
//! error so the caller's retry loop can try again.

use super::provider::{http_client, DataError, TickerListProvider};
use serde::Deserialize;
use tracing::debug;

const SCREENER_URL: &str = "https://api.nasdaq.com/api/screener/stocks";

/// Exchanges covered by the "all US tickers" list.
pub const US_EXCHANGES: [&str; 3] = ["nasdaq", "nyse", "amex"];

#[derive(Debug, Deserialize)]
struct ScreenerResponse {
    data: Option<ScreenerData>,
}

#[derive(Debug, Deserialize)]
struct ScreenerData {
    rows: Option<Vec<ScreenerRow>>,
}

#[derive(Debug, Deserialize)]
struct ScreenerRow {
    symbol: Option<String>,
}

/// Ticker list provider backed by the Nasdaq screener API.
pub struct NasdaqScreenerProvider {
    client: reqwest::blocking::Client,
    exchanges: Vec<String>,
}

impl NasdaqScreenerProvider {
    pub fn new() -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(30)?,
            exchanges: US_EXCHANGES.iter().map(|e| e.to_string()).collect(),
        })
    }

    fn screener_url(exchange: &str) -> String {
        format!("{SCREENER_URL}?tableonly=true&limit=25&offset=0&exchange={exchange}&download=true")
    }

    fn fetch_exchange(&self, exchange: &str) -> Result<Vec<String>, DataError> {
        let resp = self
            .client
            .get(Self::screener_url(exchange))
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(DataError::Other(format!(
                "HTTP {status} from screener for {exchange}"
            )));
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let symbols = parse_screener(&body)?;
        debug!(exchange, count = symbols.len(), "screener page parsed");
        Ok(symbols)
    }
}

impl TickerListProvider for NasdaqScreenerProvider {
    fn name(&self) -> &str {
        "nasdaq_screener"
    }

    fn fetch_tickers(&self) -> Result<Vec<String>, DataError> {
        let mut all = Vec::new();
        for exchange in &self.exchanges {
            all.extend(self.fetch_exchange(exchange)?);
        }
        Ok(all)
    }
}

/// Parse a screener JSON payload into trimmed, non-empty symbols.
pub(crate) fn parse_screener(body: &str) -> Result<Vec<String>, DataError> {
    let resp: ScreenerResponse = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("screener JSON: {e}")))?;

    let rows = resp
        .data
        .and_then(|d| d.rows)
        .ok_or_else(|| DataError::ResponseFormatChanged("screener payload has no data.rows".into()))?;

    Ok(rows
        .into_iter()
        .filter_map(|r| r.symbol)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
