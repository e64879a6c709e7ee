//! Builds the in-memory reference dataset from raw rows.

use std::collections::BTreeMap;

use super::encoder::{encode, EncodingFallback};
use crate::domain::{DatasetRow, ModelArtifact, RawRecord, ReferenceDataset};
use crate::TriageError;

/// Encode every raw row with the artifact's encoders and freeze the result.
///
/// # Errors
/// Returns `TriageError::Dataset` if a row has no agent label.
pub fn build_reference_dataset(
    records: Vec<RawRecord>,
    artifact: &ModelArtifact,
) -> Result<ReferenceDataset, TriageError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut unseen: BTreeMap<String, usize> = BTreeMap::new();

    for (position, record) in records.into_iter().enumerate() {
        let encoded = encode(&record, artifact);
        for fallback in encoded.fallbacks() {
            if let EncodingFallback::UnseenCategory { feature } = fallback {
                *unseen.entry(feature.clone()).or_insert(0) += 1;
            }
        }
        let row = DatasetRow::new(position, record, encoded.into_values()).ok_or_else(|| {
            TriageError::Dataset {
                // 1-based, header excluded
                row: position + 1,
                reason: "missing agent label".to_string(),
            }
        })?;
        rows.push(row);
    }

    for (feature, count) in &unseen {
        tracing::warn!(
            "{} reference rows carry values unseen by the {} encoder (sentinel used)",
            count,
            feature
        );
    }

    let dataset = ReferenceDataset::new(rows);
    tracing::info!(
        "Reference dataset ready: {} rows, {} systems",
        dataset.len(),
        dataset.systems().len()
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoricalEncoder, RawValue};

    fn artifact() -> ModelArtifact {
        ModelArtifact::builder(vec!["gender".into(), "age".into()], vec!["Sarin".into()])
            .encoder(
                "gender",
                CategoricalEncoder::new(vec!["female".into(), "male".into()]).expect("enc"),
            )
            .build()
            .expect("artifact")
    }

    fn record(pairs: &[(&str, RawValue)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_rows_are_encoded_at_load() {
        let records = vec![
            record(&[
                ("agent", "Sarin".into()),
                ("gender", "male".into()),
                ("age", 33.0.into()),
            ]),
            record(&[("agent", "Sarin".into()), ("gender", "other".into())]),
        ];
        let ds = build_reference_dataset(records, &artifact()).expect("Should build");
        assert_eq!(ds.rows()[0].vector(), &[1.0, 33.0]);
        assert_eq!(ds.rows()[1].vector(), &[0.0, 0.0]);
    }

    #[test]
    fn test_row_without_agent_rejected() {
        let records = vec![
            record(&[("agent", "Sarin".into())]),
            record(&[("agent", RawValue::Null), ("age", 20.0.into())]),
        ];
        let err = build_reference_dataset(records, &artifact()).expect_err("Should fail");
        assert!(matches!(err, TriageError::Dataset { row: 2, .. }));
    }
}
