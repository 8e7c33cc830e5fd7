use std::path::Path;

use anyhow::{anyhow, Context, Result};
use symcheck_core::services::decoder::parse_c_functions_from_file;
use symcheck_core::services::inspector::{CoverageReport, Inspector};

use crate::commands::{extract_functions, parse_library, ExtractorOptions};
use crate::read_symbol_list;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub library: String,
    /// File listing implemented symbols, one per line.
    pub implemented: String,
    /// Saved castxml dump to use instead of running the extractor.
    pub xml: Option<String>,
    pub extractor: ExtractorOptions,
}

/// Compare the library's C surface against the implemented symbol list.
pub fn check_command(opts: &CheckOptions) -> Result<CoverageReport> {
    let library = parse_library(&opts.library)?;
    let functions = match &opts.xml {
        Some(xml) => parse_c_functions_from_file(Path::new(xml))
            .with_context(|| format!("Failed to decode AST dump: {xml}"))?,
        None => extract_functions(library, &opts.extractor)?,
    };
    let implemented = read_symbol_list(Path::new(&opts.implemented))?;

    let inspector = Inspector::new();
    inspector.set_expected(library.prefix(), functions)?;
    inspector
        .report(library.prefix(), implemented.iter().map(String::as_str))
        .ok_or_else(|| anyhow!("No expected functions recorded for {}", library.prefix()))
}

/// Print a coverage report as JSON or text.
pub fn print_report(report: &CoverageReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Coverage for {}: {}/{} implemented",
        report.prefix,
        report.found.len(),
        report.expected_count()
    );
    if !report.missing.is_empty() {
        println!("Missing:");
        for name in &report.missing {
            println!("  - {name}");
        }
    }
    if !report.unexpected.is_empty() {
        println!("Not in headers:");
        for name in &report.unexpected {
            println!("  - {name}");
        }
    }
    Ok(())
}
