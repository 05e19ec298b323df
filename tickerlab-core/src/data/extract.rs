//! Symbol extraction: feed rows → sorted, deduplicated common-stock candidates.
//!
//! Type filtering depends on which columns the feed carries:
//! 1. `ETF` / `Test Issue` flag columns → keep rows where every present flag is "no"
//! 2. a security-name column → drop names containing the word "ETF"
//! 3. neither → pass everything through (logged as a warning)
//!
//! Symbols are then trimmed, emptied rows dropped, and anything with `.` or `^`
//! (share classes, warrants, indices) removed.

use super::feed::FeedTable;
use super::provider::DataError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{info, warn};

pub const SYMBOL_COLUMN: &str = "Symbol";
pub const ETF_COLUMN: &str = "ETF";
pub const TEST_ISSUE_COLUMN: &str = "Test Issue";

/// Which type filter was applied to a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    /// Explicit flag columns were present.
    Flags { etf: bool, test_issue: bool },
    /// Fell back to matching "ETF" in the named security-name column.
    SecurityName { column: String },
    /// No recognizable type columns; nothing filtered.
    PassThrough,
}

/// Extract symbols from a loaded feed.
pub fn extract_symbols(table: &FeedTable) -> Result<Vec<String>, DataError> {
    extract_with_filter(table).map(|(symbols, _)| symbols)
}

/// Extract symbols and report which type filter was used.
pub fn extract_with_filter(table: &FeedTable) -> Result<(Vec<String>, TypeFilter), DataError> {
    let symbol_col =
        table
            .column_index(SYMBOL_COLUMN)
            .ok_or_else(|| DataError::MissingSymbolColumn {
                columns: table.columns().to_vec(),
            })?;

    let filter = choose_filter(table);
    let keep: Vec<usize> = (0..table.len())
        .filter(|&row| row_passes(table, row, &filter))
        .collect();

    match &filter {
        TypeFilter::Flags { .. } => info!(
            before = table.len(),
            after = keep.len(),
            "filtered using ETF/Test Issue columns"
        ),
        TypeFilter::SecurityName { column } => info!(
            column = %column,
            before = table.len(),
            after = keep.len(),
            "filtered using security name column"
        ),
        TypeFilter::PassThrough => warn!(
            rows = table.len(),
            "no ETF/Test Issue/Security Name columns found; proceeding without type filtering"
        ),
    }

    let symbols: BTreeSet<String> = keep
        .into_iter()
        .map(|row| table.cell(row, symbol_col).trim())
        .filter(|s| is_plain_symbol(s))
        .map(str::to_string)
        .collect();

    Ok((symbols.into_iter().collect(), filter))
}

/// Non-empty and free of the `.`/`^` markers used for share classes and indices.
pub fn is_plain_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && !symbol.contains(['.', '^'])
}

fn choose_filter(table: &FeedTable) -> TypeFilter {
    let etf = table.column_index(ETF_COLUMN).is_some();
    let test_issue = table.column_index(TEST_ISSUE_COLUMN).is_some();
    if etf || test_issue {
        return TypeFilter::Flags { etf, test_issue };
    }

    table
        .columns()
        .iter()
        .find(|c| c.to_lowercase().contains("security"))
        .map(|c| TypeFilter::SecurityName { column: c.clone() })
        .unwrap_or(TypeFilter::PassThrough)
}

fn row_passes(table: &FeedTable, row: usize, filter: &TypeFilter) -> bool {
    match filter {
        TypeFilter::Flags { .. } => [ETF_COLUMN, TEST_ISSUE_COLUMN]
            .iter()
            .filter_map(|name| table.column_index(name))
            .all(|col| flag_is_no(table.cell(row, col))),
        TypeFilter::SecurityName { column } => match table.column_index(column) {
            Some(col) => !etf_word().is_match(table.cell(row, col)),
            None => true,
        },
        TypeFilter::PassThrough => true,
    }
}

/// Flag cells read "no" only for explicit negatives; blanks do not qualify.
fn flag_is_no(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "N" | "NO" | "FALSE" | "0"
    )
}

fn etf_word() -> &'static Regex {
    static ETF_WORD: OnceLock<Regex> = OnceLock::new();
    ETF_WORD.get_or_init(|| Regex::new(r"(?i)\bETF\b").expect("static regex"))
}
