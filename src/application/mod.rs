//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement the
//! prediction pipeline: encode → score → select → normalize → resolve.

mod catalog;
mod config;
pub mod encoder;
pub mod medicine;
pub mod normalizer;
mod reference;
pub mod scorer;
pub mod selector;
mod service;

pub use catalog::SymptomCatalog;
pub use config::{PredictorConfig, StoreConfig};
pub use encoder::{category_text, encode, EncodedFeatureVector, EncodingFallback, SENTINEL_CODE};
pub use medicine::{MedicinePolicy, MedicineResolver};
pub use normalizer::{normalize, NormalizationStrategy};
pub use reference::build_reference_dataset;
pub use scorer::{score_all, AgentScore, AgentScores, ScoreSource};
pub use selector::{euclidean_distance, select, SelectionParams, SelectionPolicy};
pub use service::PredictionService;
