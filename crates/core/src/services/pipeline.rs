use std::io;
use std::thread;

use thiserror::Error;

use crate::config::VerifierConfig;
use crate::model::CFunctionSet;
use crate::services::decoder::{parse_c_functions, DecodeError};
use crate::services::extractor::{CommandRunner, ExtractError, Invocation, ProcessRunner};
use crate::services::inspector::{Inspector, InspectorError};
use crate::services::materialize::{SourceMaterializer, TempFileMaterializer};
use crate::stubs::{Library, UnknownLibrary};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    UnknownLibrary(#[from] UnknownLibrary),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inspector(#[from] InspectorError),
}

/// Runs stub → temp file → extractor → decoder → inspector for one library at a time.
pub struct Verifier<'a> {
    pub config: &'a VerifierConfig,
    pub materializer: &'a dyn SourceMaterializer,
    pub runner: &'a dyn CommandRunner,
}

impl<'a> Verifier<'a> {
    /// Extract the C functions visible through `library`'s public headers.
    ///
    /// The materialized stub is removed before this returns, whether or not
    /// extraction and decoding succeed.
    pub fn stub_c_functions(&self, library: Library) -> Result<CFunctionSet, VerifyError> {
        let stub = library.stub();
        let source = self.materializer.materialize(&stub)?;
        let invocation = Invocation::castxml(self.config, &source);
        let xml = self.runner.run(&invocation)?;
        let functions = parse_c_functions(&xml)?;
        drop(source);
        Ok(functions)
    }

    /// Extract `library`'s functions and record them under its prefix.
    pub fn register(&self, library: Library, inspector: &Inspector) -> Result<(), VerifyError> {
        tracing::info!(%library, "getting C AST");
        let functions = self.stub_c_functions(library)?;
        inspector.set_expected(library.prefix(), functions)?;
        Ok(())
    }

    /// Same as [`Verifier::register`] for a library key given as text.
    ///
    /// Unknown keys fail before anything touches the filesystem.
    pub fn register_named(&self, key: &str, inspector: &Inspector) -> Result<(), VerifyError> {
        let library: Library = key.parse()?;
        self.register(library, inspector)
    }

    /// Register several libraries concurrently, one pipeline per library.
    ///
    /// A failure for one library leaves the others unaffected; results are
    /// returned in input order.
    pub fn register_all(
        &self,
        libraries: &[Library],
        inspector: &Inspector,
    ) -> Vec<(Library, Result<(), VerifyError>)> {
        thread::scope(|scope| {
            let handles: Vec<_> = libraries
                .iter()
                .map(|&library| (library, scope.spawn(move || self.register(library, inspector))))
                .collect();
            handles
                .into_iter()
                .map(|(library, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(VerifyError::Io(io::Error::other("verification thread panicked")))
                    });
                    (library, result)
                })
                .collect()
        })
    }
}

/// Materializer honoring the configured scratch dir.
pub fn default_materializer(config: &VerifierConfig) -> TempFileMaterializer {
    match &config.scratch_dir {
        Some(dir) => TempFileMaterializer::in_dir(dir),
        None => TempFileMaterializer::new(),
    }
}

/// Subprocess runner honoring the configured timeout.
pub fn default_runner(config: &VerifierConfig) -> ProcessRunner {
    ProcessRunner::new().with_timeout(config.timeout())
}
