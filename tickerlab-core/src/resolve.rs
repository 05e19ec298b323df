//! Metadata resolution: symbol → common-stock [`TickerRecord`] or nothing.
//!
//! A lookup failure counts as "no data": it comes back as
//! [`Resolution::LookupFailed`], is logged at WARN, and yields no record.

use crate::data::provider::{DataError, MetadataProvider, QuoteProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Region stamped on every record; only US listings are ingested.
pub const US_REGION: &str = "US";

/// Normalized metadata persisted for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub region: String,
}

impl TickerRecord {
    /// Build a record from a provider profile. Prefers the short display name.
    pub fn from_profile(symbol: &str, profile: QuoteProfile) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: non_empty(profile.short_name).or_else(|| non_empty(profile.long_name)),
            exchange: profile.exchange,
            currency: profile.currency,
            region: US_REGION.to_string(),
        }
    }
}

/// Outcome of resolving one symbol.
#[derive(Debug)]
pub enum Resolution {
    /// Common stock with metadata.
    Resolved(TickerRecord),
    /// Provider knows the symbol but it is not a common-stock equity.
    NotCommonStock {
        quote_type: Option<String>,
        stock_type: Option<String>,
    },
    /// Provider returned nothing for the symbol.
    NoData,
    /// The lookup itself failed; treated as absent.
    LookupFailed(DataError),
}

impl Resolution {
    /// The record, if resolution produced one.
    pub fn record(&self) -> Option<&TickerRecord> {
        match self {
            Resolution::Resolved(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<TickerRecord> {
        match self {
            Resolution::Resolved(record) => Some(record),
            _ => None,
        }
    }

    /// Short reason label for skip log lines.
    pub fn skip_reason(&self) -> &'static str {
        match self {
            Resolution::Resolved(_) => "resolved",
            Resolution::NotCommonStock { .. } => "not a common stock",
            Resolution::NoData => "no metadata",
            Resolution::LookupFailed(_) => "lookup failed",
        }
    }
}

/// `EQUITY` quote type, and a `COMMON` stock subtype when one is reported.
pub fn is_common_stock(profile: &QuoteProfile) -> bool {
    if profile.quote_type.as_deref() != Some("EQUITY") {
        return false;
    }
    match profile.stock_type.as_deref() {
        Some(subtype) if !subtype.is_empty() => subtype == "COMMON",
        _ => true,
    }
}

/// Resolves symbols against a metadata provider.
pub struct MetadataResolver<'a> {
    provider: &'a dyn MetadataProvider,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(provider: &'a dyn MetadataProvider) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn resolve(&self, symbol: &str) -> Resolution {
        match self.provider.lookup(symbol) {
            Ok(Some(profile)) if is_common_stock(&profile) => {
                Resolution::Resolved(TickerRecord::from_profile(symbol, profile))
            }
            Ok(Some(profile)) => {
                debug!(
                    symbol,
                    quote_type = ?profile.quote_type,
                    stock_type = ?profile.stock_type,
                    "not a common stock"
                );
                Resolution::NotCommonStock {
                    quote_type: profile.quote_type,
                    stock_type: profile.stock_type,
                }
            }
            Ok(None) => Resolution::NoData,
            Err(e) => {
                warn!(
                    symbol,
                    provider = self.provider.name(),
                    error = %e,
                    "metadata lookup failed; treating as no data"
                );
                Resolution::LookupFailed(e)
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
