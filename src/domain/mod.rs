//! Domain layer: Core business types.
//!
//! This module contains the data model of the matcher: observations, the
//! trained artifact, reference cases and prediction results. Types here
//! validate themselves but perform no I/O.

mod artifact;
mod dataset;
mod observation;
mod prediction;

pub use artifact::{
    ArtifactBuilder, ArtifactError, CategoricalEncoder, ModelArtifact, ScoreRange, SymptomSlot,
    ARTIFACT_VERSION,
};
pub use dataset::{DatasetRow, ReferenceDataset};
pub use observation::{
    normalize_key, split_symptoms, FieldSource, PatientObservation, RawRecord, RawValue,
    AGENT_FIELD, SEVERITY_FIELD, SYMPTOMS_FIELD, SYMPTOM_SLOT_PREFIX, SYSTEM_FIELD,
    UNKNOWN_CATEGORY,
};
pub use prediction::{DosageSet, DosageTable, PredictionResult, DOSAGE_FIELDS};
