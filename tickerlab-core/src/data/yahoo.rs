//! Yahoo Finance metadata provider.
//!
//! Reads the `meta` block of Yahoo's v8 chart API for a one-day range, which
//! carries the instrument type, display names, exchange and currency. Handles
//! rate limiting and transient network errors with exponential backoff.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; a changed payload surfaces as `ResponseFormatChanged`.

use super::provider::{http_client, DataError, MetadataProvider, QuoteProfile};
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    instrument_type: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    exchange_name: Option<String>,
    currency: Option<String>,
}

/// Yahoo Finance metadata provider.
pub struct YahooChartProvider {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooChartProvider {
    pub fn new() -> Result<Self, DataError> {
        Ok(Self {
            client: http_client(30)?,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str) -> String {
        format!("https://query2.finance.yahoo.com/v8/finance/chart/{symbol}?range=1d&interval=1d")
    }

    /// Parse the chart API response. `Ok(None)` when Yahoo does not know the symbol.
    fn parse_response(resp: ChartResponse) -> Result<Option<QuoteProfile>, DataError> {
        if let Some(err) = resp.chart.error {
            if err.code == "Not Found" {
                return Ok(None);
            }
            return Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            )));
        }

        let Some(data) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(None);
        };

        let meta = data.meta;
        Ok(Some(QuoteProfile {
            quote_type: meta.instrument_type,
            stock_type: None,
            short_name: meta.short_name,
            long_name: meta.long_name,
            exchange: meta.exchange_name,
            currency: meta.currency,
        }))
    }

    /// Execute the chart request with retry on rate limits and transient network errors.
    fn fetch_with_retry(&self, symbol: &str) -> Result<Option<QuoteProfile>, DataError> {
        let url = Self::chart_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    return Self::parse_response(chart);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MetadataProvider for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn lookup(&self, symbol: &str) -> Result<Option<QuoteProfile>, DataError> {
        self.fetch_with_retry(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Option<QuoteProfile>, DataError> {
        YahooChartProvider::parse_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn parses_equity_meta() {
        let body = r#"{"chart":{"result":[{"meta":{
            "currency":"USD","symbol":"AAPL","exchangeName":"NMS",
            "fullExchangeName":"NasdaqGS","instrumentType":"EQUITY",
            "longName":"Apple Inc.","shortName":"Apple Inc.","regularMarketPrice":230.1
        },"timestamp":[1729000000],"indicators":{"quote":[{}]}}],"error":null}}"#;

        let profile = parse(body).unwrap().unwrap();
        assert_eq!(profile.quote_type.as_deref(), Some("EQUITY"));
        assert_eq!(profile.exchange.as_deref(), Some("NMS"));
        assert_eq!(profile.currency.as_deref(), Some("USD"));
        assert_eq!(profile.short_name.as_deref(), Some("Apple Inc."));
        assert!(profile.stock_type.is_none());
    }

    #[test]
    fn not_found_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse(body).unwrap().is_none());
    }

    #[test]
    fn other_error_code_is_format_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(
            parse(body),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn empty_result_is_no_data() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse(body).unwrap().is_none());
    }

    #[test]
    fn chart_url_uses_one_day_range() {
        let url = YahooChartProvider::chart_url("MSFT");
        assert!(url.contains("/chart/MSFT?"));
        assert!(url.contains("range=1d"));
    }
}
