//! Logging setup for the command-line tools.
//!
//! Library code only emits `tracing` events; binaries call [`init`] once.
//! `RUST_LOG` takes precedence over the level chosen on the command line.

use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one event per line
    #[default]
    Compact,
    /// JSON lines for log shippers
    Json,
}

impl LogFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default level filter when `RUST_LOG` is unset.
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Reads `LOG_FORMAT` (compact or json).
    pub fn from_env() -> Self {
        Self {
            format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Default level from a `-v` count: 0 → info, 1 → debug, 2+ → trace.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &LogConfig) {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    // Already installed (e.g. by a test harness) is not an error.
    let _ = match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(LogConfig::default().with_verbosity(0).default_level, "info");
        assert_eq!(LogConfig::default().with_verbosity(1).default_level, "debug");
        assert_eq!(LogConfig::default().with_verbosity(5).default_level, "trace");
    }

    #[test]
    fn format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Compact);
    }
}
