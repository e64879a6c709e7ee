//! Symptom catalog: the symptom vocabulary of the reference dataset.
//!
//! Built once at load time. Labels are deduplicated case-insensitively and
//! keep the first spelling seen, so every per-system list is a subset of the
//! global list.

use std::collections::{BTreeMap, BTreeSet};

use super::encoder::category_text;
use crate::domain::{
    normalize_key, split_symptoms, ModelArtifact, RawValue, ReferenceDataset, SYMPTOMS_FIELD,
};
use crate::TriageError;

#[derive(Debug, Clone, Default)]
pub struct SymptomCatalog {
    all: BTreeSet<String>,
    by_system: BTreeMap<String, BTreeSet<String>>,
    systems: BTreeMap<String, String>,
}

impl SymptomCatalog {
    #[must_use]
    pub fn build(dataset: &ReferenceDataset, artifact: &ModelArtifact) -> Self {
        let mut display: BTreeMap<String, String> = BTreeMap::new();
        let mut by_system: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for row in dataset.rows() {
            // Same decode path as the encoder, so stored codes agree with row vectors.
            let mut labels = category_text(row.record(), SYMPTOMS_FIELD, artifact)
                .map(|text| split_symptoms(&text))
                .unwrap_or_default();
            labels.extend(
                artifact
                    .symptom_slots()
                    .iter()
                    .filter(|slot| {
                        row.value(&artifact.features()[slot.position])
                            .and_then(RawValue::as_number)
                            .is_some_and(|flag| flag > 0.0)
                    })
                    .map(|slot| slot.label.clone()),
            );

            for label in labels {
                let key = normalize_key(&label);
                let shown = display.entry(key).or_insert(label).clone();
                if let Some(system) = row.system_key() {
                    by_system.entry(system.to_string()).or_default().insert(shown);
                }
            }
        }

        let systems = dataset.systems().clone();
        let all: BTreeSet<String> = display.into_values().collect();
        tracing::debug!(
            "Symptom catalog: {} labels across {} systems",
            all.len(),
            by_system.len()
        );
        Self {
            all,
            by_system,
            systems,
        }
    }

    /// Every known symptom label, sorted.
    #[must_use]
    pub fn symptoms(&self) -> Vec<String> {
        self.all.iter().cloned().collect()
    }

    /// Symptom labels seen with a bodily system (case-insensitive, trimmed).
    ///
    /// # Errors
    /// Returns `TriageError::UnknownSystem` if the dataset has no rows for `system`.
    pub fn for_system(&self, system: &str) -> Result<Vec<String>, TriageError> {
        let key = normalize_key(system);
        if !self.systems.contains_key(&key) {
            return Err(TriageError::UnknownSystem(system.to_string()));
        }
        Ok(self
            .by_system
            .get(&key)
            .map(|labels| labels.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Known bodily systems (display text), sorted.
    #[must_use]
    pub fn systems(&self) -> Vec<String> {
        let shown: BTreeSet<&String> = self.systems.values().collect();
        shown.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::encoder::encode;
    use crate::domain::{CategoricalEncoder, DatasetRow, RawRecord};

    fn row_with(
        artifact: &ModelArtifact,
        i: usize,
        system: &str,
        symptoms: RawValue,
        flags: &[(&str, f64)],
    ) -> DatasetRow {
        let mut r = RawRecord::new();
        r.insert("agent".into(), RawValue::from("Sarin"));
        r.insert("human_system".into(), RawValue::from(system));
        r.insert("symptoms".into(), symptoms);
        for (name, v) in flags {
            r.insert((*name).to_string(), RawValue::Number(*v));
        }
        let vector = encode(&r, artifact).into_values();
        DatasetRow::new(i, r, vector).expect("row")
    }

    fn row(i: usize, system: &str, symptoms: RawValue, flags: &[(&str, f64)]) -> DatasetRow {
        row_with(&artifact(false), i, system, symptoms, flags)
    }

    fn artifact(with_encoder: bool) -> ModelArtifact {
        let mut b = ModelArtifact::builder(
            vec!["symptoms".into(), "sym_Blisters".into()],
            vec!["Sarin".into()],
        );
        if with_encoder {
            b = b.encoder(
                "symptoms",
                CategoricalEncoder::new(vec!["miosis, drooling".into(), "rash".into()])
                    .expect("enc"),
            );
        }
        b.build().expect("artifact")
    }

    #[test]
    fn test_catalog_dedupes_and_sorts() {
        let ds = ReferenceDataset::new(vec![
            row(0, "Nervous", RawValue::from("Miosis, drooling"), &[]),
            row(1, "Respiratory", RawValue::from("cough,  miosis ,"), &[]),
            row(2, "Skin", RawValue::Null, &[("sym_Blisters", 1.0)]),
        ]);
        let catalog = SymptomCatalog::build(&ds, &artifact(false));

        assert_eq!(catalog.symptoms(), ["Blisters", "Miosis", "cough", "drooling"]);
        assert_eq!(
            catalog.for_system("respiratory ").expect("known"),
            ["Miosis", "cough"]
        );
        assert_eq!(catalog.systems(), ["Nervous", "Respiratory", "Skin"]);
        assert!(matches!(
            catalog.for_system("Ocular"),
            Err(TriageError::UnknownSystem(_))
        ));
    }

    #[test]
    fn test_numeric_codes_match_row_vectors() {
        let a = artifact(true);
        let ds = ReferenceDataset::new(vec![
            row_with(&a, 0, "Nervous", RawValue::Number(0.0), &[]),
            row_with(&a, 1, "Skin", RawValue::Number(1.0), &[]),
            row_with(&a, 2, "Skin", RawValue::Number(7.0), &[]),
        ]);
        let catalog = SymptomCatalog::build(&ds, &a);
        assert_eq!(catalog.symptoms(), ["drooling", "miosis", "rash"]);

        // Listed labels come from the same code the row vector carries.
        assert_eq!(ds.rows()[0].vector()[0], 0.0);
        assert_eq!(ds.rows()[1].vector()[0], 1.0);
        // An out-of-range code is absent on both sides.
        assert_eq!(ds.rows()[2].vector()[0], 0.0);
        assert_eq!(catalog.for_system("Skin").expect("known"), ["rash"]);
    }
}
