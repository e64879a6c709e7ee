//! Store ports: Traits for loading the persisted model artifact and reference dataset.
//!
//! These traits abstract the on-disk formats (JSON, CSV) from the application.

use crate::domain::{ModelArtifact, RawRecord};

/// Source of the immutable model artifact.
pub trait ArtifactSource {
    /// Error type for artifact loading.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load and validate the artifact.
    ///
    /// # Errors
    /// Returns error if the artifact cannot be read, fails integrity checks,
    /// or does not describe a consistent model.
    fn load_artifact(&self) -> Result<ModelArtifact, Self::Error>;
}

/// Source of raw reference rows, one record per historical case.
pub trait DatasetSource {
    /// Error type for dataset loading.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every raw record in file order.
    ///
    /// # Errors
    /// Returns error if the dataset cannot be read or parsed.
    fn load_records(&self) -> Result<Vec<RawRecord>, Self::Error>;
}
