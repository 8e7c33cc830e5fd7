use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the extractor binary.
pub const EXTRACTOR_BIN_ENV: &str = "CASTXML_BIN";

/// Default extractor binary name, resolved via `PATH`.
pub const DEFAULT_EXTRACTOR_BIN: &str = "castxml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse config YAML at {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings for a verification run.
///
/// Constructed once at startup and passed to the pipeline by reference; the
/// per-library stub and prefix tables are not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Extractor binary (name on `PATH` or absolute path).
    #[serde(default = "default_extractor_bin")]
    pub extractor_bin: PathBuf,
    /// Extra flags passed to the extractor ahead of the fixed ones (e.g. `-I/opt/ceph/include`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
    /// Kill the extractor after this many seconds. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Directory for materialized stubs. `None` uses the platform temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn default_extractor_bin() -> PathBuf {
    PathBuf::from(DEFAULT_EXTRACTOR_BIN)
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            extractor_bin: default_extractor_bin(),
            extra_args: Vec::new(),
            timeout_secs: None,
            scratch_dir: None,
        }
    }
}

impl VerifierConfig {
    /// Load a config file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if matches!(ext, "yaml" | "yml") {
            serde_yaml::from_str(&body)
                .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })
        } else {
            serde_json::from_str(&body)
                .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
        }
    }

    /// Apply `CASTXML_BIN` if set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(bin) = std::env::var_os(EXTRACTOR_BIN_ENV).filter(|v| !v.is_empty()) {
            self.extractor_bin = PathBuf::from(bin);
        }
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
