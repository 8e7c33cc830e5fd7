//! symcheck-core
//!
//! Core library for checking hand-written bindings against the C function
//! surface of native libraries.
//!
//! The pipeline synthesizes a small C translation unit per library, runs an
//! AST extractor (castxml) over it, decodes the XML into a typed model of C
//! function declarations, and records the result in an [`services::inspector::Inspector`]
//! keyed by the library's symbol prefix.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends.

pub mod config;
pub mod info;
pub mod model;
pub mod services;
pub mod stubs;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
