use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use symcheck_core::config::VerifierConfig;
use symcheck_core::model::CFunctionSet;
use symcheck_core::stubs::Library;

/// Extractor settings collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct ExtractorOptions {
    /// Optional JSON/YAML config file.
    pub config: Option<String>,
    /// Explicit extractor binary; wins over config and `CASTXML_BIN`.
    pub castxml: Option<String>,
    pub timeout_secs: Option<u64>,
    pub scratch_dir: Option<String>,
}

/// Build the run configuration: file (if any), then environment, then flags.
pub fn resolve_config(opts: &ExtractorOptions) -> Result<VerifierConfig> {
    let config = match &opts.config {
        Some(path) => VerifierConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config: {path}"))?,
        None => VerifierConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(bin) = &opts.castxml {
        config.extractor_bin = PathBuf::from(bin);
    }
    if opts.timeout_secs.is_some() {
        config.timeout_secs = opts.timeout_secs;
    }
    if let Some(dir) = &opts.scratch_dir {
        config.scratch_dir = Some(PathBuf::from(dir));
    }
    Ok(config)
}

/// Parse a library key, listing the supported ones on failure.
pub fn parse_library(key: &str) -> Result<Library> {
    key.parse::<Library>().map_err(|e| {
        let known: Vec<_> = Library::ALL.iter().map(|l| l.key()).collect();
        anyhow!("{e} (supported: {})", known.join(", "))
    })
}

/// Print a function set as JSON or as one line per function.
pub fn print_functions(functions: &CFunctionSet, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(functions)?);
        return Ok(());
    }

    if functions.is_empty() {
        println!("Functions: (none)");
        return Ok(());
    }

    for f in functions {
        let args = f.arguments.len();
        let variadic = if f.variadic { ", ..." } else { "" };
        match (&f.file, f.line) {
            (Some(file), Some(line)) => {
                println!("- {} ({args} args{variadic}) {file}:{line}", f.name)
            }
            _ => println!("- {} ({args} args{variadic})", f.name),
        }
    }
    Ok(())
}
