//! # cwa-triage
//!
//! Chemical warfare agent exposure matcher.
//!
//! Given a patient presentation (demographics, vital signs, reported
//! symptoms, affected bodily system), this crate identifies the most likely
//! agent and returns an initial dosage recommendation for a fixed set of
//! antidotes and supportive medications.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (observations, the trained artifact, reference dataset, predictions)
//! - `ports`: Trait definitions for estimators and artifact/dataset sources
//! - `adapters`: Concrete implementations (JSON artifact, CSV dataset, estimators, manifest)
//! - `application`: The prediction pipeline (encode, score, select, normalize, resolve)

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use application::{PredictionService, PredictorConfig, StoreConfig};
pub use domain::{DosageSet, ModelArtifact, PatientObservation, PredictionResult};

/// Result type for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;

/// Main error type for the triage pipeline
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("No reference case matches the candidate agents: {agents:?}")]
    NoCandidate { agents: Vec<String> },

    #[error("Unknown bodily system: {0}")]
    UnknownSystem(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid artifact: {0}")]
    Artifact(#[from] domain::ArtifactError),

    #[error("Storage operation failed: {0}")]
    Store(#[from] adapters::StoreError),

    #[error("Invalid reference row {row}: {reason}")]
    Dataset { row: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TriageError {
    /// Whether the caller can fix the query (as opposed to a broken deployment).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownSystem(_) | Self::UnknownAgent(_))
    }
}
