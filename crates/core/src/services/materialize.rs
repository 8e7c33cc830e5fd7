use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::TempPath;

use crate::stubs::StubSource;

/// Writes a stub to scratch storage and hands back a path that is deleted on drop.
///
/// The pipeline only ever sees this capability, so tests can swap in a
/// materializer that records what it wrote without touching the real temp dir.
pub trait SourceMaterializer: Send + Sync {
    fn materialize(&self, stub: &StubSource) -> io::Result<TempPath>;
}

/// Writes stubs to uniquely named `*-<library>.c` files.
#[derive(Debug, Clone, Default)]
pub struct TempFileMaterializer {
    dir: Option<PathBuf>,
}

impl TempFileMaterializer {
    /// Use the platform temp dir.
    pub fn new() -> Self {
        Self { dir: None }
    }

    /// Use `dir` instead of the platform temp dir.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }
}

impl SourceMaterializer for TempFileMaterializer {
    fn materialize(&self, stub: &StubSource) -> io::Result<TempPath> {
        let suffix = format!("-{}.c", stub.library().key());
        let mut builder = tempfile::Builder::new();
        builder.suffix(&suffix);
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        // On write failure the NamedTempFile is dropped and removed here.
        file.write_all(stub.as_bytes())?;
        file.flush()?;
        tracing::debug!(path = %file.path().display(), library = %stub.library(), "materialized C stub");
        Ok(file.into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubs::Library;

    #[test]
    fn temp_file_embeds_library_key_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = TempFileMaterializer::in_dir(dir.path());
        let stub = Library::Rbd.stub();

        let path = materializer.materialize(&stub).unwrap();
        let owned = path.to_path_buf();
        assert!(owned.file_name().unwrap().to_string_lossy().ends_with("-rbd.c"));
        assert_eq!(std::fs::read_to_string(&owned).unwrap(), stub.as_str());

        drop(path);
        assert!(!owned.exists());
    }

    #[test]
    fn missing_scratch_dir_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = TempFileMaterializer::in_dir(dir.path().join("nope"));
        let err = materializer.materialize(&Library::Rados.stub()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
