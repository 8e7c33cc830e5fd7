use anyhow::Result;
use serde::Serialize;
use symcheck_core::stubs::Library;

use crate::commands::parse_library;

#[derive(Debug, Serialize)]
pub struct LibraryInfo {
    pub name: String,
    pub prefix: String,
}

/// List the native libraries this binary knows how to stub.
pub fn list_libraries_command(json: bool) -> Result<()> {
    let entries: Vec<LibraryInfo> = Library::ALL
        .iter()
        .map(|lib| LibraryInfo { name: lib.key().to_string(), prefix: lib.prefix().to_string() })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Libraries:");
    for entry in entries {
        println!("- {} (prefix {})", entry.name, entry.prefix);
    }
    Ok(())
}

/// Print the C stub used for `library`.
pub fn stub_command(library: &str) -> Result<()> {
    let library = parse_library(library)?;
    print!("{}", library.stub().as_str());
    Ok(())
}
