//! Newline-delimited input lists.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, Result};

/// Identity of an input item: trimmed and lower-cased.
pub fn item_key(item: &str) -> String {
    item.trim().to_lowercase()
}

/// Parse an input list.
///
/// Blank lines and `#` comments are skipped. Duplicates are removed
/// case-insensitively, keeping the first spelling seen.
pub fn parse_input(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(item_key(line)))
        .map(str::to_string)
        .collect()
}

/// Read and parse an input file. A missing file is a configuration error.
pub fn load_input(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(AppError::config(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_input(text.trim_start_matches('\u{feff}')))
}
