//! The trained model artifact consumed at inference time.
//!
//! A `ModelArtifact` bundles everything the offline training step froze:
//! the canonical feature order, categorical encoders, per-agent estimators and
//! (optionally) a static dosage table. It is validated once at construction
//! and immutable afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::observation::{normalize_key, SYMPTOM_SLOT_PREFIX};
use super::prediction::DosageTable;
use crate::ports::Estimator;

/// Current artifact format version.
pub const ARTIFACT_VERSION: u32 = 1;

/// Errors raised while validating a model artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactError {
    #[error("Unsupported artifact version: {0}")]
    UnsupportedVersion(u32),

    #[error("Artifact has no features")]
    NoFeatures,

    #[error("Duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("Artifact has no agents")]
    NoAgents,

    #[error("Duplicate agent: {0}")]
    DuplicateAgent(String),

    #[error("Encoder for unknown feature: {0}")]
    EncoderForUnknownFeature(String),

    #[error("Invalid encoder for {feature}: {reason}")]
    InvalidEncoder { feature: String, reason: String },

    #[error("Estimator for unknown agent: {0}")]
    EstimatorForUnknownAgent(String),

    #[error("Estimator for {agent} expects {got} features, artifact defines {expected}")]
    EstimatorShape {
        agent: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid estimator for {agent}: {reason}")]
    InvalidEstimator { agent: String, reason: String },

    #[error("Invalid score range [{lo}, {hi}]")]
    InvalidScoreRange { lo: f64, hi: f64 },
}

/// Frozen label encoding for one categorical feature.
///
/// The code of a class is its position in `classes`, matching the
/// training-time label encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderClasses", into = "EncoderClasses")]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct EncoderClasses {
    classes: Vec<String>,
}

impl CategoricalEncoder {
    /// Create an encoder from its ordered class list.
    ///
    /// # Errors
    /// Returns a description of the problem if a class appears twice.
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), code).is_some() {
                return Err(format!("duplicate class {class:?}"));
            }
        }
        Ok(Self { classes, index })
    }

    /// Code for a class seen during training.
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Inverse transform: class text for a code.
    #[must_use]
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl TryFrom<EncoderClasses> for CategoricalEncoder {
    type Error = String;

    fn try_from(raw: EncoderClasses) -> Result<Self, Self::Error> {
        Self::new(raw.classes)
    }
}

impl From<CategoricalEncoder> for EncoderClasses {
    fn from(encoder: CategoricalEncoder) -> Self {
        Self {
            classes: encoder.classes,
        }
    }
}

/// Valid raw-score interval emitted by the estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub lo: f64,
    pub hi: f64,
}

impl ScoreRange {
    /// # Errors
    /// Returns `ArtifactError::InvalidScoreRange` unless both bounds are finite and `lo < hi`.
    pub fn new(lo: f64, hi: f64) -> Result<Self, ArtifactError> {
        let range = Self { lo, hi };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.lo.is_finite() && self.hi.is_finite() && self.lo < self.hi {
            Ok(())
        } else {
            Err(ArtifactError::InvalidScoreRange {
                lo: self.lo,
                hi: self.hi,
            })
        }
    }
}

impl Default for ScoreRange {
    /// Severity-style scale used by the reference estimators.
    fn default() -> Self {
        Self { lo: 0.0, hi: 3.0 }
    }
}

/// A multi-hot symptom slot in the canonical feature list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomSlot {
    /// Position in the canonical feature list
    pub position: usize,
    /// Display label (feature name without the slot prefix)
    pub label: String,
    /// Case-folded label used for matching
    pub key: String,
}

/// Immutable trained model state, shared read-only for the process lifetime.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    version: u32,
    trained_at: Option<chrono::DateTime<chrono::Utc>>,
    features: Vec<String>,
    agents: Vec<String>,
    encoders: BTreeMap<String, CategoricalEncoder>,
    estimators: BTreeMap<String, Arc<dyn Estimator>>,
    dosage_table: Option<DosageTable>,
    score_range: ScoreRange,
    symptom_slots: Vec<SymptomSlot>,
}

impl ModelArtifact {
    /// Start building an artifact from its canonical feature list and agent list.
    #[must_use]
    pub fn builder(features: Vec<String>, agents: Vec<String>) -> ArtifactBuilder {
        ArtifactBuilder {
            version: ARTIFACT_VERSION,
            trained_at: None,
            features,
            agents,
            encoders: BTreeMap::new(),
            estimators: BTreeMap::new(),
            dosage_table: None,
            score_range: ScoreRange::default(),
        }
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn trained_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.trained_at
    }

    /// Canonical ordered feature names.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Known agent identifiers, in artifact order.
    #[must_use]
    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    #[must_use]
    pub fn encoder(&self, feature: &str) -> Option<&CategoricalEncoder> {
        self.encoders.get(feature)
    }

    #[must_use]
    pub fn estimator(&self, agent: &str) -> Option<&Arc<dyn Estimator>> {
        self.estimators.get(agent)
    }

    #[must_use]
    pub fn dosage_table(&self) -> Option<&DosageTable> {
        self.dosage_table.as_ref()
    }

    #[must_use]
    pub fn score_range(&self) -> ScoreRange {
        self.score_range
    }

    /// Multi-hot symptom slots, in canonical order.
    #[must_use]
    pub fn symptom_slots(&self) -> &[SymptomSlot] {
        &self.symptom_slots
    }

    /// Number of agents that have a trained estimator.
    #[must_use]
    pub fn estimator_count(&self) -> usize {
        self.estimators.len()
    }
}

/// Validating builder for [`ModelArtifact`].
#[must_use]
pub struct ArtifactBuilder {
    version: u32,
    trained_at: Option<chrono::DateTime<chrono::Utc>>,
    features: Vec<String>,
    agents: Vec<String>,
    encoders: BTreeMap<String, CategoricalEncoder>,
    estimators: BTreeMap<String, Arc<dyn Estimator>>,
    dosage_table: Option<DosageTable>,
    score_range: ScoreRange,
}

impl ArtifactBuilder {
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn trained_at(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.trained_at = Some(ts);
        self
    }

    pub fn encoder(mut self, feature: impl Into<String>, encoder: CategoricalEncoder) -> Self {
        self.encoders.insert(feature.into(), encoder);
        self
    }

    pub fn estimator(mut self, agent: impl Into<String>, estimator: Arc<dyn Estimator>) -> Self {
        self.estimators.insert(agent.into(), estimator);
        self
    }

    pub fn dosage_table(mut self, table: DosageTable) -> Self {
        self.dosage_table = Some(table);
        self
    }

    pub fn score_range(mut self, range: ScoreRange) -> Self {
        self.score_range = range;
        self
    }

    /// Validate and freeze the artifact.
    ///
    /// # Errors
    /// Returns `ArtifactError` if the feature list, agent list, encoders,
    /// estimators or score range are inconsistent.
    pub fn build(self) -> Result<ModelArtifact, ArtifactError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(self.version));
        }

        if self.features.is_empty() {
            return Err(ArtifactError::NoFeatures);
        }
        let mut seen = HashSet::with_capacity(self.features.len());
        for f in &self.features {
            if !seen.insert(f.as_str()) {
                return Err(ArtifactError::DuplicateFeature(f.clone()));
            }
        }

        if self.agents.is_empty() {
            return Err(ArtifactError::NoAgents);
        }
        let mut seen_agents = HashSet::with_capacity(self.agents.len());
        for a in &self.agents {
            if !seen_agents.insert(a.as_str()) {
                return Err(ArtifactError::DuplicateAgent(a.clone()));
            }
        }

        if let Some(name) = self.encoders.keys().find(|k| !seen.contains(k.as_str())) {
            return Err(ArtifactError::EncoderForUnknownFeature(name.clone()));
        }

        let expected = self.features.len();
        for (agent, estimator) in &self.estimators {
            if !seen_agents.contains(agent.as_str()) {
                return Err(ArtifactError::EstimatorForUnknownAgent(agent.clone()));
            }
            if estimator.n_features() != expected {
                return Err(ArtifactError::EstimatorShape {
                    agent: agent.clone(),
                    expected,
                    got: estimator.n_features(),
                });
            }
        }

        self.score_range.validate()?;

        let symptom_slots = self
            .features
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.encoders.contains_key(name.as_str()))
            .filter_map(|(position, name)| {
                let label = name.strip_prefix(SYMPTOM_SLOT_PREFIX)?;
                (!label.trim().is_empty()).then(|| SymptomSlot {
                    position,
                    label: label.to_string(),
                    key: normalize_key(label),
                })
            })
            .collect();

        Ok(ModelArtifact {
            version: self.version,
            trained_at: self.trained_at,
            features: self.features,
            agents: self.agents,
            encoders: self.encoders,
            estimators: self.estimators,
            dosage_table: self.dosage_table,
            score_range: self.score_range,
            symptom_slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(usize, f64);

    impl Estimator for Fixed {
        fn n_features(&self) -> usize {
            self.0
        }
        fn predict(&self, _features: &[f64]) -> f64 {
            self.1
        }
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_encoder_roundtrip_and_unseen() {
        let enc = CategoricalEncoder::new(names(&["female", "male"])).expect("Should build");
        assert_eq!(enc.encode("male"), Some(1));
        assert_eq!(enc.encode("other"), None);
        assert_eq!(enc.decode(0), Some("female"));
        assert_eq!(enc.decode(7), None);
    }

    #[test]
    fn test_encoder_rejects_duplicates() {
        assert!(CategoricalEncoder::new(names(&["a", "a"])).is_err());
        let parsed: Result<CategoricalEncoder, _> =
            serde_json::from_str(r#"{"classes": ["x", "x"]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_build_derives_symptom_slots() {
        let artifact = ModelArtifact::builder(
            names(&["gender", "age", "sym_Cough", "sym_wheezing"]),
            names(&["Chlorine"]),
        )
        .encoder("gender", CategoricalEncoder::new(names(&["female", "male"])).expect("enc"))
        .build()
        .expect("Should build");

        let slots = artifact.symptom_slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].position, 2);
        assert_eq!(slots[0].label, "Cough");
        assert_eq!(slots[0].key, "cough");
    }

    #[test]
    fn test_build_rejects_shape_mismatch() {
        let err = ModelArtifact::builder(names(&["age", "oxygen"]), names(&["Sarin"]))
            .estimator("Sarin", Arc::new(Fixed(3, 1.0)))
            .build()
            .expect_err("Should reject");
        assert_eq!(
            err,
            ArtifactError::EstimatorShape {
                agent: "Sarin".into(),
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_build_rejects_inconsistent_lists() {
        assert_eq!(
            ModelArtifact::builder(vec![], names(&["Sarin"])).build().expect_err("no features"),
            ArtifactError::NoFeatures
        );
        assert!(matches!(
            ModelArtifact::builder(names(&["age", "age"]), names(&["Sarin"])).build(),
            Err(ArtifactError::DuplicateFeature(_))
        ));
        assert!(matches!(
            ModelArtifact::builder(names(&["age"]), names(&["Sarin"]))
                .estimator("VX", Arc::new(Fixed(1, 1.0)))
                .build(),
            Err(ArtifactError::EstimatorForUnknownAgent(_))
        ));
        assert!(matches!(
            ModelArtifact::builder(names(&["age"]), names(&["Sarin"]))
                .encoder("gender", CategoricalEncoder::new(vec![]).expect("enc"))
                .build(),
            Err(ArtifactError::EncoderForUnknownFeature(_))
        ));
    }

    #[test]
    fn test_score_range_validation() {
        assert!(ScoreRange::new(1.0, 3.0).is_ok());
        assert!(ScoreRange::new(3.0, 3.0).is_err());
        assert!(ScoreRange::new(f64::NAN, 3.0).is_err());
    }
}
