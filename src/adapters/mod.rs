//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats:
//! - `estimators`: linear, tree-ensemble and constant estimators
//! - `json_artifact`: the JSON model artifact
//! - `csv_dataset`: the CSV reference dataset
//! - `manifest`: SHA-256 integrity manifest for the artifact directory
//! - `sanitize`: clinical-value redaction for logs

pub mod csv_dataset;
mod error;
pub mod estimators;
pub mod json_artifact;
pub mod manifest;
pub mod sanitize;

pub use csv_dataset::CsvDatasetStore;
pub use error::StoreError;
pub use json_artifact::{ArtifactFile, JsonArtifactStore};
