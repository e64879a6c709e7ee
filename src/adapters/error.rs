//! Error type shared by the file-backed store adapters.

use std::path::PathBuf;

use crate::domain::ArtifactError;

/// Error type for artifact and dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid artifact: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Invalid dataset row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Manifest required but not found at {0:?}")]
    ManifestMissing(PathBuf),

    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),

    #[error("File {0} is not bound by the manifest")]
    UnboundFile(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
