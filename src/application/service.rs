//! Prediction service: Orchestrates the matching pipeline.
//!
//! This service coordinates:
//! - Feature encoding of the inbound observation
//! - Per-agent scoring
//! - Reference case selection
//! - Confidence normalization
//! - Dosage resolution
//!
//! It also answers catalog queries (agents, symptoms, systems, per-agent rows).

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::catalog::SymptomCatalog;
use super::config::PredictorConfig;
use super::encoder::encode;
use super::medicine::MedicineResolver;
use super::normalizer::normalize;
use super::reference::build_reference_dataset;
use super::scorer::score_all;
use super::selector::select;
use crate::adapters::StoreError;
use crate::domain::{
    ModelArtifact, PatientObservation, PredictionResult, RawRecord, ReferenceDataset,
};
use crate::ports::{ArtifactSource, DatasetSource};
use crate::TriageError;

/// Immutable prediction context.
///
/// Built once at startup; every call borrows it read-only, so one instance
/// can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: Arc<ModelArtifact>,
    dataset: Arc<ReferenceDataset>,
    catalog: SymptomCatalog,
    medicine: MedicineResolver,
    config: PredictorConfig,
}

impl PredictionService {
    /// Create a service from a validated artifact and raw reference rows.
    ///
    /// # Errors
    /// Returns error if a reference row cannot be used.
    pub fn new(
        artifact: ModelArtifact,
        records: Vec<RawRecord>,
        config: PredictorConfig,
    ) -> Result<Self, TriageError> {
        let dataset = build_reference_dataset(records, &artifact)?;
        let catalog = SymptomCatalog::build(&dataset, &artifact);
        let medicine = MedicineResolver::new(config.medicine, &artifact, &dataset);

        tracing::info!(
            "Prediction service ready (agents={}, rows={}, symptoms={}, policy={:?})",
            artifact.agents().len(),
            dataset.len(),
            catalog.symptoms().len(),
            config.selection.policy
        );

        Ok(Self {
            artifact: Arc::new(artifact),
            dataset: Arc::new(dataset),
            catalog,
            medicine,
            config,
        })
    }

    /// Load the artifact and dataset through their ports and build the service.
    ///
    /// # Errors
    /// Returns error if either source fails or the dataset is unusable.
    pub fn load<A, D>(artifacts: &A, datasets: &D, config: PredictorConfig) -> Result<Self, TriageError>
    where
        A: ArtifactSource,
        D: DatasetSource,
        A::Error: Into<StoreError>,
        D::Error: Into<StoreError>,
    {
        let artifact = artifacts
            .load_artifact()
            .map_err(|e| TriageError::Store(e.into()))?;
        let records = datasets
            .load_records()
            .map_err(|e| TriageError::Store(e.into()))?;
        Self::new(artifact, records, config)
    }

    /// Predict the agent and initial dosages for an observation.
    ///
    /// Randomness (only used by the context selector and the confidence-floor
    /// normalizer) comes from the configured seed, or OS entropy if unset.
    ///
    /// # Errors
    /// Returns `TriageError::NoCandidate` if no reference case survives selection.
    pub fn predict(&self, observation: &PatientObservation) -> Result<PredictionResult, TriageError> {
        let mut rng = match self.config.rng_seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        self.predict_with_rng(observation, &mut rng)
    }

    /// Same as [`Self::predict`], drawing randomness from `rng`.
    ///
    /// # Errors
    /// Returns `TriageError::NoCandidate` if no reference case survives selection.
    pub fn predict_with_rng<R>(
        &self,
        observation: &PatientObservation,
        rng: &mut R,
    ) -> Result<PredictionResult, TriageError>
    where
        R: Rng + ?Sized,
    {
        tracing::debug!("Encoding observation {:?}", observation);
        let vector = encode(observation, &self.artifact);
        if !vector.fallbacks().is_empty() {
            tracing::debug!("Encoding took {} fallbacks", vector.fallbacks().len());
        }

        let scores = score_all(&vector, &self.artifact);
        let row = select(
            observation,
            &vector,
            &scores,
            &self.dataset,
            &self.config.selection,
            rng,
        )?;

        // Confidence is that of the agent actually returned.
        let raw = scores.get(row.agent()).map_or(0.0, |s| s.raw);
        let score = normalize(
            raw,
            self.artifact.score_range(),
            &self.config.normalization,
            rng,
        );
        let medicine = self.medicine.resolve(row);

        tracing::info!(
            "Matched {} (row {}, score {:.2})",
            row.agent(),
            row.position(),
            score
        );

        Ok(PredictionResult {
            predicted_agent: row.agent().to_string(),
            score,
            medicine,
        })
    }

    /// Agent identifiers, in artifact order.
    #[must_use]
    pub fn list_agents(&self) -> Vec<String> {
        self.artifact.agents().to_vec()
    }

    /// Known symptom labels, sorted.
    #[must_use]
    pub fn list_symptoms(&self) -> Vec<String> {
        self.catalog.symptoms()
    }

    /// Known bodily systems, sorted.
    #[must_use]
    pub fn list_systems(&self) -> Vec<String> {
        self.catalog.systems()
    }

    /// Symptom labels recorded for a bodily system, sorted.
    ///
    /// # Errors
    /// Returns `TriageError::UnknownSystem` if the system has no reference rows.
    pub fn symptoms_for_system(&self, system: &str) -> Result<Vec<String>, TriageError> {
        self.catalog.for_system(system)
    }

    /// Raw reference rows for an agent (case-insensitive, trimmed).
    ///
    /// # Errors
    /// Returns `TriageError::UnknownAgent` if no row matches.
    pub fn agent_details(&self, agent: &str) -> Result<Vec<&RawRecord>, TriageError> {
        let rows: Vec<&RawRecord> = self
            .dataset
            .rows_for_agent(agent)
            .map(|row| row.record())
            .collect();
        if rows.is_empty() {
            return Err(TriageError::UnknownAgent(agent.to_string()));
        }
        Ok(rows)
    }

    #[must_use]
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    #[must_use]
    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    #[must_use]
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::estimators::ConstantEstimator;
    use crate::application::normalizer::NormalizationStrategy;
    use crate::domain::{CategoricalEncoder, RawValue};

    fn artifact() -> ModelArtifact {
        let features: Vec<String> = ["gender", "human_system", "age", "sym_cough", "sym_wheezing", "sym_miosis"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        ModelArtifact::builder(features, vec!["Chlorine".into(), "Sarin".into()])
            .encoder(
                "gender",
                CategoricalEncoder::new(vec!["female".into(), "male".into()]).expect("enc"),
            )
            .encoder(
                "human_system",
                CategoricalEncoder::new(vec!["Nervous".into(), "Respiratory".into()])
                    .expect("enc"),
            )
            .estimator("Chlorine", Arc::new(ConstantEstimator::new(2.5, 6)))
            .estimator("Sarin", Arc::new(ConstantEstimator::new(0.5, 6)))
            .build()
            .expect("artifact")
    }

    fn records() -> Vec<RawRecord> {
        let rows: [&[(&str, RawValue)]; 2] = [
            &[
                ("agent", RawValue::from("Chlorine")),
                ("gender", RawValue::from("male")),
                ("human_system", RawValue::from("Respiratory")),
                ("symptoms", RawValue::from("cough, wheezing")),
                ("age", RawValue::Number(38.0)),
                ("methylprednisolone_mg_initial", RawValue::Number(125.0)),
            ],
            &[
                ("agent", RawValue::from("Sarin")),
                ("gender", RawValue::from("female")),
                ("human_system", RawValue::from("Nervous")),
                ("symptoms", RawValue::from("miosis")),
                ("age", RawValue::Number(40.0)),
                ("atropine_mg_initial", RawValue::Number(2.0)),
            ],
        ];
        rows.iter()
            .map(|r| r.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
            .collect()
    }

    fn service(config: PredictorConfig) -> PredictionService {
        PredictionService::new(artifact(), records(), config).expect("service")
    }

    fn chlorine_case() -> PatientObservation {
        PatientObservation::new()
            .with("gender", "male")
            .with("symptoms", "cough, wheezing")
            .with("human_system", "Respiratory")
            .with("age", 40.0)
    }

    #[test]
    fn test_end_to_end_chlorine() {
        let svc = service(PredictorConfig::default());
        let result = svc.predict(&chlorine_case()).expect("Should predict");

        assert_eq!(result.predicted_agent, "Chlorine");
        assert!((0.0..=1.0).contains(&result.score));
        assert_eq!(result.score, 0.83);
        assert_eq!(result.medicine.get("methylprednisolone_mg_initial"), 125.0);
        assert_eq!(result.medicine.get("atropine_mg_initial"), 0.0);
    }

    #[test]
    fn test_seeded_floor_is_reproducible() {
        let config = PredictorConfig {
            normalization: NormalizationStrategy::floor(0.6, 0.1),
            rng_seed: Some(9),
            ..PredictorConfig::default()
        };
        let svc = service(config);
        let a = svc.predict(&chlorine_case()).expect("predict");
        let b = svc.predict(&chlorine_case()).expect("predict");
        assert_eq!(a, b);
        assert!((0.6..=1.0).contains(&a.score));
    }

    #[test]
    fn test_unseen_category_still_predicts() {
        let svc = service(PredictorConfig::default());
        let obs = chlorine_case().with("gender", "undisclosed");
        assert!(svc.predict(&obs).is_ok());
    }

    #[test]
    fn test_catalog_queries() {
        let svc = service(PredictorConfig::default());
        assert_eq!(svc.list_agents(), ["Chlorine", "Sarin"]);
        assert_eq!(svc.list_symptoms(), ["cough", "miosis", "wheezing"]);
        assert_eq!(svc.list_systems(), ["Nervous", "Respiratory"]);
        assert_eq!(
            svc.symptoms_for_system("NERVOUS").expect("known"),
            ["miosis"]
        );
        assert!(matches!(
            svc.symptoms_for_system("Skin"),
            Err(TriageError::UnknownSystem(_))
        ));

        let rows = svc.agent_details(" sarin ").expect("known");
        assert_eq!(rows.len(), 1);
        assert!(matches!(
            svc.agent_details("Mustard"),
            Err(TriageError::UnknownAgent(ref name)) if name == "Mustard"
        ));
    }

    #[test]
    fn test_service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PredictionService>();
    }
}
