pub mod commands;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read implemented symbol names, one per line.
///
/// Blank lines and `#` comments are skipped; surrounding whitespace is trimmed.
pub fn read_symbol_list(path: &Path) -> Result<Vec<String>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbol list: {}", path.display()))?;
    Ok(body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
