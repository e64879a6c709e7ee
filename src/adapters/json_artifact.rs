//! JSON artifact adapter: Implementation of `ArtifactSource`.
//!
//! The artifact is a single JSON document exported by the training pipeline:
//!
//! ```json
//! {
//!   "version": 1,
//!   "trained_at": "2024-05-01T12:00:00Z",
//!   "features": ["gender", "human_system", "age", "sym_cough"],
//!   "agents": ["Chlorine", "Sarin"],
//!   "encoders": { "gender": { "classes": ["female", "male"] } },
//!   "estimators": { "Chlorine": { "kind": "linear", "coefficients": [...], "intercept": 1.0 } },
//!   "dosage_table": { "Sarin": { "atropine_mg_initial": 2.0 } },
//!   "score_range": { "lo": 0.0, "hi": 3.0 }
//! }
//! ```
//!
//! If the artifact directory carries a `manifest.json`, the artifact must be
//! bound by it and all bound digests must match before the file is parsed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::estimators::EstimatorSpec;
use super::manifest::verify_bound_file;
use super::StoreError;
use crate::domain::{
    ArtifactError, CategoricalEncoder, DosageTable, ModelArtifact, ScoreRange, ARTIFACT_VERSION,
};
use crate::ports::ArtifactSource;

fn default_version() -> u32 {
    ARTIFACT_VERSION
}

/// On-disk artifact document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub trained_at: Option<chrono::DateTime<chrono::Utc>>,
    pub features: Vec<String>,
    pub agents: Vec<String>,
    #[serde(default)]
    pub encoders: BTreeMap<String, CategoricalEncoder>,
    #[serde(default)]
    pub estimators: BTreeMap<String, EstimatorSpec>,
    #[serde(default)]
    pub dosage_table: Option<DosageTable>,
    #[serde(default)]
    pub score_range: Option<ScoreRange>,
}

impl ArtifactFile {
    /// Instantiate estimators and validate the whole artifact.
    ///
    /// # Errors
    /// Returns `ArtifactError` if any estimator is malformed or the artifact is inconsistent.
    pub fn into_artifact(self) -> Result<ModelArtifact, ArtifactError> {
        let width = self.features.len();
        let mut builder = ModelArtifact::builder(self.features, self.agents)
            .version(self.version)
            .score_range(self.score_range.unwrap_or_default());

        if let Some(ts) = self.trained_at {
            builder = builder.trained_at(ts);
        }
        for (feature, encoder) in self.encoders {
            builder = builder.encoder(feature, encoder);
        }
        for (agent, spec) in self.estimators {
            let estimator = spec
                .build(width)
                .map_err(|reason| ArtifactError::InvalidEstimator {
                    agent: agent.clone(),
                    reason,
                })?;
            builder = builder.estimator(agent, estimator);
        }
        if let Some(table) = self.dosage_table {
            builder = builder.dosage_table(table);
        }

        builder.build()
    }
}

/// Loads the artifact from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    path: PathBuf,
    require_manifest: bool,
}

impl JsonArtifactStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            require_manifest: false,
        }
    }

    /// Refuse to load unless a manifest binds the artifact.
    #[must_use]
    pub fn require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = require;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSource for JsonArtifactStore {
    type Error = StoreError;

    fn load_artifact(&self) -> Result<ModelArtifact, StoreError> {
        verify_bound_file(&self.path, self.require_manifest)?;

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let file: ArtifactFile = serde_json::from_str(&content)?;
        let artifact = file.into_artifact()?;

        tracing::info!(
            "Loaded artifact from {:?} (version={}, features={}, agents={}, estimators={}, static_dosage={})",
            self.path,
            artifact.version(),
            artifact.features().len(),
            artifact.agents().len(),
            artifact.estimator_count(),
            artifact.dosage_table().is_some()
        );
        if let Some(ts) = artifact.trained_at() {
            tracing::debug!("Artifact trained at {}", ts.to_rfc3339());
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::manifest::Manifest;
    use tempfile::tempdir;

    const ARTIFACT_JSON: &str = r#"{
        "version": 1,
        "trained_at": "2024-05-01T12:00:00Z",
        "features": ["gender", "age", "sym_cough"],
        "agents": ["Chlorine", "Sarin", "Lewisite"],
        "encoders": {"gender": {"classes": ["female", "male"]}},
        "estimators": {
            "Chlorine": {"kind": "linear", "coefficients": [0.0, 0.01, 1.5], "intercept": 0.5},
            "Sarin": {"kind": "constant", "value": 1.0}
        },
        "dosage_table": {"Sarin": {"atropine_mg_initial": 2.0}},
        "score_range": {"lo": 1.0, "hi": 3.0}
    }"#;

    #[test]
    fn test_parse_artifact() {
        let file: ArtifactFile = serde_json::from_str(ARTIFACT_JSON).expect("Should parse");
        let artifact = file.into_artifact().expect("Should validate");

        assert_eq!(artifact.features().len(), 3);
        assert_eq!(artifact.agents(), ["Chlorine", "Sarin", "Lewisite"]);
        assert_eq!(artifact.estimator_count(), 2);
        assert!(artifact.estimator("Lewisite").is_none());
        assert_eq!(artifact.encoder("gender").and_then(|e| e.encode("male")), Some(1));
        assert_eq!(artifact.score_range(), ScoreRange { lo: 1.0, hi: 3.0 });
        assert_eq!(artifact.symptom_slots().len(), 1);
        assert!(artifact.trained_at().is_some());
    }

    #[test]
    fn test_defaults_for_optional_sections() {
        let file: ArtifactFile =
            serde_json::from_str(r#"{"features": ["age"], "agents": ["VX"]}"#).expect("parse");
        let artifact = file.into_artifact().expect("Should validate");
        assert_eq!(artifact.score_range(), ScoreRange::default());
        assert!(artifact.dosage_table().is_none());
    }

    #[test]
    fn test_linear_width_mismatch_rejected() {
        let file: ArtifactFile = serde_json::from_str(
            r#"{"features": ["age", "oxygen"], "agents": ["VX"],
                "estimators": {"VX": {"kind": "linear", "coefficients": [1.0], "intercept": 0.0}}}"#,
        )
        .expect("parse");
        assert!(matches!(
            file.into_artifact(),
            Err(ArtifactError::EstimatorShape { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_store_loads_with_manifest() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("cwa_artifact.json");
        std::fs::write(&path, ARTIFACT_JSON).expect("write");
        Manifest::for_files(temp.path(), &["cwa_artifact.json"])
            .expect("hash")
            .write(temp.path())
            .expect("write manifest");

        let artifact = JsonArtifactStore::new(&path)
            .require_manifest(true)
            .load_artifact()
            .expect("Should load");
        assert_eq!(artifact.agents().len(), 3);

        std::fs::write(&path, ARTIFACT_JSON.replace("0.5", "0.6")).expect("tamper");
        assert!(matches!(
            JsonArtifactStore::new(&path).load_artifact(),
            Err(StoreError::HashMismatch(_))
        ));
    }

    #[test]
    fn test_store_missing_file() {
        let temp = tempdir().expect("tempdir");
        let err = JsonArtifactStore::new(temp.path().join("nope.json"))
            .load_artifact()
            .expect_err("Should fail");
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
