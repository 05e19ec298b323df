//! Property tests for symbol extraction.
//!
//! Uses proptest to verify:
//! 1. Output never contains `.` or `^` symbols, blanks or duplicates, and is sorted
//! 2. Rows flagged as ETF or test issue never survive
//! 3. Row order does not change the result
//! 4. A symbols file round-trips the extractor's output

use proptest::prelude::*;
use tickerlab_core::data::{extract_symbols, parse_symbols, FeedTable};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_symbol() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[A-Z]{1,5}",
        1 => "[A-Z]{1,4}\\.[A-Z]",
        1 => "[A-Z]{1,4}\\^[A-Z]",
        1 => " [A-Z]{1,4} ",
        1 => Just(String::new()),
    ]
}

fn arb_flag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("N".to_string()),
        Just("Y".to_string()),
        Just("n".to_string()),
        Just(String::new()),
    ]
}

/// (symbol, etf flag, test issue flag)
fn arb_rows() -> impl Strategy<Value = Vec<(String, String, String)>> {
    prop::collection::vec((arb_symbol(), arb_flag(), arb_flag()), 0..40)
}

fn flag_table(rows: &[(String, String, String)]) -> FeedTable {
    FeedTable::new(
        vec!["Symbol".into(), "ETF".into(), "Test Issue".into()],
        rows.iter()
            .map(|(s, e, t)| vec![s.clone(), e.clone(), t.clone()])
            .collect(),
    )
}

fn symbol_table(symbols: &[String]) -> FeedTable {
    FeedTable::new(
        vec!["Symbol".into()],
        symbols.iter().map(|s| vec![s.clone()]).collect(),
    )
}

// ── 1. Output shape ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn output_is_plain_sorted_and_unique(symbols in prop::collection::vec(arb_symbol(), 0..60)) {
        let out = extract_symbols(&symbol_table(&symbols)).unwrap();

        for s in &out {
            prop_assert!(!s.is_empty());
            prop_assert!(!s.contains('.') && !s.contains('^'), "{s}");
            prop_assert_eq!(s.trim(), s.as_str());
        }
        prop_assert!(out.windows(2).all(|w| w[0] < w[1]), "not strictly sorted: {:?}", out);
    }
}

// ── 2. Flag filtering ────────────────────────────────────────────────

proptest! {
    #[test]
    fn flagged_rows_never_survive(rows in arb_rows()) {
        let out = extract_symbols(&flag_table(&rows)).unwrap();

        for (symbol, etf, test_issue) in &rows {
            let trimmed = symbol.trim();
            let is_no = |f: &str| f.eq_ignore_ascii_case("n");
            let passing_row_exists = rows.iter().any(|(s, e, t)| {
                s.trim() == trimmed && is_no(e) && is_no(t)
            });
            if !(is_no(etf) && is_no(test_issue)) && !passing_row_exists {
                prop_assert!(!out.iter().any(|s| s == trimmed), "{trimmed} leaked");
            }
        }
    }

    #[test]
    fn every_plain_unflagged_symbol_is_kept(rows in arb_rows()) {
        let out = extract_symbols(&flag_table(&rows)).unwrap();

        for (symbol, etf, test_issue) in &rows {
            let trimmed = symbol.trim();
            let plain = !trimmed.is_empty() && !trimmed.contains(['.', '^']);
            if plain && etf.eq_ignore_ascii_case("n") && test_issue.eq_ignore_ascii_case("n") {
                prop_assert!(out.iter().any(|s| s == trimmed), "{trimmed} dropped");
            }
        }
    }
}

// ── 3. Order independence ────────────────────────────────────────────

proptest! {
    #[test]
    fn row_order_is_irrelevant(rows in arb_rows()) {
        let forward = extract_symbols(&flag_table(&rows)).unwrap();
        let mut reversed_rows = rows.clone();
        reversed_rows.reverse();
        let reversed = extract_symbols(&flag_table(&reversed_rows)).unwrap();
        prop_assert_eq!(forward, reversed);
    }

    #[test]
    fn extraction_is_idempotent(symbols in prop::collection::vec(arb_symbol(), 0..60)) {
        let once = extract_symbols(&symbol_table(&symbols)).unwrap();
        let twice = extract_symbols(&symbol_table(&once)).unwrap();
        prop_assert_eq!(once, twice);
    }
}

// ── 4. Symbols file ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn symbols_file_content_round_trips(symbols in prop::collection::vec(arb_symbol(), 0..60)) {
        let out = extract_symbols(&symbol_table(&symbols)).unwrap();
        let content: String = out.iter().map(|s| format!("{s}\n")).collect();
        prop_assert_eq!(parse_symbols(&content), out);
    }
}
