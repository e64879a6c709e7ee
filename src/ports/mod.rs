//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the prediction pipeline and the outside world (trained model
//! families, persisted artifact and dataset formats).

mod estimator;
mod store;

pub use estimator::Estimator;
pub use store::{ArtifactSource, DatasetSource};
