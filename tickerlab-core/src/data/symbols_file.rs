//! Plain-text symbols files: one ticker per line.
//!
//! `#` lines and blank lines are ignored when reading, so a hand-curated file
//! can carry comments.

use super::provider::DataError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a symbols file into a sorted, deduplicated list.
pub fn read_symbols_file(path: &Path) -> Result<Vec<String>, DataError> {
    if !path.exists() {
        return Err(DataError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_symbols(&content))
}

/// Parse symbols-file text.
pub fn parse_symbols(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write symbols one per line, newline-terminated. Creates parent directories.
///
/// The file is written beside `path` and renamed into place, so a failure
/// never leaves a truncated list behind. An empty list produces an empty file.
pub fn write_symbols_file(path: &Path, symbols: &[String]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut body = symbols.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);
    if let Err(e) = fs::write(&staging, body).and_then(|()| fs::rename(&staging, path)) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blanks() {
        let parsed = parse_symbols("AAPL\n\n# comment\nMSFT\n");
        assert_eq!(parsed, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn dedupes_and_sorts() {
        let parsed = parse_symbols("  MSFT\nAAPL\nMSFT  \r\nAAPL\n");
        assert_eq!(parsed, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = read_symbols_file(Path::new("/no/such/symbols.txt")).unwrap_err();
        assert!(matches!(err, DataError::SourceNotFound { .. }), "{err:?}");
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/symbols.txt");
        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
        write_symbols_file(&path, &symbols).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "AAPL\nMSFT\n");
        assert_eq!(read_symbols_file(&path).unwrap(), symbols);
    }

    #[test]
    fn empty_list_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.txt");
        write_symbols_file(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn overwrite_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.txt");
        fs::write(&path, "OLD\n").unwrap();
        write_symbols_file(&path, &["NEW".to_string()]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "NEW\n");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "{names:?}");
    }
}
