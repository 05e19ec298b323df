//! Feed loader for delimited symbol directories.
//!
//! Reads a tabular source (an `http(s)://` URL or a local file) into a
//! [`FeedTable`]. The Nasdaq trader feed is pipe-delimited while locally
//! downloaded listings are usually plain CSV, so parsing tries `|` first and
//! falls back to `,`.
//!
//! The Nasdaq feed ends with a single-field `File Creation Time: ...` footer,
//! so short rows are accepted and their missing cells read as empty.

use super::provider::{http_client, is_remote, DataError};
use tracing::{debug, info};

/// Primary delimiter (Nasdaq trader feeds).
pub const PRIMARY_DELIMITER: u8 = b'|';
/// Fallback delimiter (CSV exports).
pub const FALLBACK_DELIMITER: u8 = b',';

/// A parsed feed: a header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl FeedTable {
    /// Build a table from header names and rows of cells.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Convenience constructor for tests and fixtures.
    pub fn from_str_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose trimmed name equals `name` (case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name))
    }

    /// Cell at `(row, column)`; missing cells in short rows read as `""`.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Load a feed from a URL or local path.
pub fn load_feed(source: &str) -> Result<FeedTable, DataError> {
    let text = read_source(source)?;
    let table = parse_feed(source, &text)?;
    info!(
        source,
        rows = table.len(),
        columns = table.columns().len(),
        "loaded feed"
    );
    Ok(table)
}

/// Parse feed text, trying the primary delimiter and then the fallback.
pub fn parse_feed(source: &str, text: &str) -> Result<FeedTable, DataError> {
    match parse_with_delimiter(text, PRIMARY_DELIMITER) {
        Ok(table) => Ok(table),
        Err(primary) => {
            debug!(source, reason = %primary, "pipe-delimited parse failed; retrying as CSV");
            parse_with_delimiter(text, FALLBACK_DELIMITER).map_err(|fallback| {
                DataError::SourceUnreadable {
                    source_name: source.to_string(),
                    reason: format!("not pipe-delimited ({primary}) nor comma-delimited ({fallback})"),
                }
            })
        }
    }
}

/// One parse attempt. Fails on reader errors or when the header does not
/// split into at least two columns (the delimiter is evidently wrong).
fn parse_with_delimiter(text: &str, delimiter: u8) -> Result<FeedTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.len() < 2 {
        return Err(format!("header has {} column(s)", columns.len()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(FeedTable { columns, rows })
}

fn read_source(source: &str) -> Result<String, DataError> {
    let unreadable = |reason: String| DataError::SourceUnreadable {
        source_name: source.to_string(),
        reason,
    };

    if is_remote(source) {
        let client = http_client(60)?;
        let resp = client
            .get(source)
            .send()
            .map_err(|e| unreadable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(unreadable(format!("HTTP {status}")));
        }
        resp.text().map_err(|e| unreadable(e.to_string()))
    } else {
        std::fs::read_to_string(source).map_err(|e| unreadable(e.to_string()))
    }
}
