//! Symbol feeds, ticker sources and external data providers

pub mod extract;
pub mod feed;
pub mod nasdaq;
pub mod provider;
pub mod source;
pub mod symbols_file;
pub mod yahoo;

pub use extract::{extract_symbols, extract_with_filter, is_plain_symbol, TypeFilter};
pub use feed::{load_feed, parse_feed, FeedTable};
pub use nasdaq::NasdaqScreenerProvider;
pub use provider::{DataError, MetadataProvider, QuoteProfile, TickerListProvider};
pub use source::{LocalFileSource, RemoteTickerSource, Sleeper, ThreadSleeper, TickerSource};
pub use symbols_file::{parse_symbols, read_symbols_file, write_symbols_file};
pub use yahoo::YahooChartProvider;
