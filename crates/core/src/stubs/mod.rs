//! C stub sources and symbol prefixes for the supported native libraries.
//!
//! Each stub includes the library's public headers plus a tiny marker
//! function so the extractor always has a non-empty translation unit to
//! chew on. The marker shows up in extracted function sets; consumers must
//! tolerate it (prefix filtering drops it naturally).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the marker function defined by every stub.
pub const MARKER_FUNCTION: &str = "foo";

/// Macro guarding the marker function definition.
pub const MARKER_MACRO: &str = "GNDN";

const MARKER_SOURCE: &str = r#"

#define GNDN
GNDN int foo(int x) {
    return x;
}
"#;

const CEPHFS_HEADERS: &str = r#"
#define FILE_OFFSET_BITS 64
#include <stdlib.h>
#define __USE_FILE_OFFSET64
#include <cephfs/libcephfs.h>
"#;

const RADOS_HEADERS: &str = r#"
#include <rados/librados.h>
"#;

const RBD_HEADERS: &str = r#"
#include <rbd/librbd.h>
#include <rbd/features.h>
"#;

/// Closed set of native libraries the checker knows how to stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    Cephfs,
    Rados,
    Rbd,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no C stub available for '{0}'")]
pub struct UnknownLibrary(pub String);

impl Library {
    pub const ALL: [Library; 3] = [Library::Cephfs, Library::Rados, Library::Rbd];

    /// Key used on the command line and in temp file names.
    pub fn key(self) -> &'static str {
        match self {
            Library::Cephfs => "cephfs",
            Library::Rados => "rados",
            Library::Rbd => "rbd",
        }
    }

    /// Common C symbol prefix of the library's API.
    pub fn prefix(self) -> &'static str {
        match self {
            Library::Cephfs => "ceph_",
            Library::Rados => "rados_",
            Library::Rbd => "rbd_",
        }
    }

    /// The full C translation unit handed to the extractor.
    pub fn stub(self) -> StubSource {
        let headers = match self {
            Library::Cephfs => CEPHFS_HEADERS,
            Library::Rados => RADOS_HEADERS,
            Library::Rbd => RBD_HEADERS,
        };
        StubSource { library: self, text: format!("{headers}{MARKER_SOURCE}") }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Library {
    type Err = UnknownLibrary;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Library::ALL
            .into_iter()
            .find(|lib| lib.key() == s)
            .ok_or_else(|| UnknownLibrary(s.to_string()))
    }
}

/// A literal C translation unit for one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSource {
    library: Library,
    text: String,
}

impl StubSource {
    pub fn library(&self) -> Library {
        self.library
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

/// Look up the stub for a library key, rejecting unknown keys.
pub fn stub_for(key: &str) -> Result<StubSource, UnknownLibrary> {
    key.parse::<Library>().map(Library::stub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_library_has_header_and_marker() {
        for lib in Library::ALL {
            let stub = lib.stub();
            assert!(stub.as_str().contains("#include <"), "{lib} stub lacks an include");
            assert!(stub.as_str().contains("GNDN int foo(int x)"));
            assert!(lib.prefix().ends_with('_'));
        }
        assert!(Library::Rados.stub().as_str().contains("<rados/librados.h>"));
        assert!(Library::Rbd.stub().as_str().contains("<rbd/features.h>"));
        assert!(Library::Cephfs.stub().as_str().contains("<cephfs/libcephfs.h>"));
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for lib in Library::ALL {
            assert_eq!(lib.key().parse::<Library>(), Ok(lib));
        }
        assert_eq!("RADOS".parse::<Library>(), Err(UnknownLibrary("RADOS".into())));
    }

    #[test]
    fn stub_for_unknown_key_names_the_key() {
        let err = stub_for("rgw").unwrap_err();
        assert_eq!(err.to_string(), "no C stub available for 'rgw'");
    }
}
