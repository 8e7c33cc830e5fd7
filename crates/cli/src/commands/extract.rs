use std::path::Path;

use anyhow::{Context, Result};
use symcheck_core::model::CFunctionSet;
use symcheck_core::services::decoder::parse_c_functions_from_file;
use symcheck_core::services::pipeline::{default_materializer, default_runner, Verifier};
use symcheck_core::stubs::Library;

use crate::commands::{parse_library, print_functions, resolve_config, ExtractorOptions};

/// Run the extractor over `library`'s stub and return the decoded functions.
pub fn extract_functions(library: Library, opts: &ExtractorOptions) -> Result<CFunctionSet> {
    let config = resolve_config(opts)?;
    let materializer = default_materializer(&config);
    let runner = default_runner(&config);
    let verifier = Verifier { config: &config, materializer: &materializer, runner: &runner };
    verifier
        .stub_c_functions(library)
        .with_context(|| format!("Failed to extract C functions for {library}"))
}

/// Extract and print the C functions visible through a library's headers.
pub fn extract_command(library: &str, opts: &ExtractorOptions, json: bool) -> Result<()> {
    let library = parse_library(library)?;
    let functions = extract_functions(library, opts)?;
    print_functions(&functions, json)
}

/// Decode a saved castxml dump and print its functions.
pub fn parse_command(file: &str, json: bool) -> Result<()> {
    let functions = parse_c_functions_from_file(Path::new(file))
        .with_context(|| format!("Failed to decode AST dump: {file}"))?;
    print_functions(&functions, json)
}
