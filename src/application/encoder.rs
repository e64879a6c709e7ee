//! Feature encoder: raw observation → canonical feature vector.
//!
//! The same code path encodes inbound observations and raw reference rows,
//! so both always share the artifact's frozen encodings.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::domain::{
    normalize_key, split_symptoms, CategoricalEncoder, FieldSource, ModelArtifact, RawValue,
    SEVERITY_FIELD, SYMPTOMS_FIELD, UNKNOWN_CATEGORY,
};

/// Code used for categorical values never seen during training.
pub const SENTINEL_CODE: f64 = 0.0;

/// A fallback taken while encoding. Not an error: encoding always succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingFallback {
    /// Field absent; the feature's default was used.
    Missing { feature: String },
    /// Categorical value not among the encoder's classes; sentinel used.
    UnseenCategory { feature: String },
    /// Numeric feature with a value that is not a number; 0 used.
    NotNumeric { feature: String },
    /// Symptom label outside the known vocabulary; dropped.
    UnknownSymptom { label: String },
}

/// Numeric vector in canonical feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    values: Vec<f64>,
    fallbacks: Vec<EncodingFallback>,
}

impl EncodedFeatureVector {
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fallbacks taken, in canonical feature order (unknown symptoms last).
    #[must_use]
    pub fn fallbacks(&self) -> &[EncodingFallback] {
        &self.fallbacks
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Severity words used by the reference corpus.
fn severity_level(text: &str) -> Option<f64> {
    match normalize_key(text).as_str() {
        "mild" => Some(1.0),
        "moderate" => Some(2.0),
        "severe" => Some(3.0),
        _ => None,
    }
}

fn stored_code(value: &RawValue, encoder: &CategoricalEncoder) -> Option<usize> {
    match value {
        RawValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
            let code = *n as usize;
            (code < encoder.classes().len()).then_some(code)
        }
        _ => None,
    }
}

/// Category text of a field as the encoder sees it.
///
/// For sources that carry codes, a number on a label-encoded feature is
/// decoded back to its class text; a number that is not a valid code counts
/// as absent. Everything else is the value's trimmed string form.
pub fn category_text<'a, S>(
    source: &'a S,
    feature: &str,
    artifact: &'a ModelArtifact,
) -> Option<Cow<'a, str>>
where
    S: FieldSource + ?Sized,
{
    let value = source.field(feature)?;
    match (artifact.encoder(feature), value) {
        (Some(encoder), RawValue::Number(_)) if source.carries_codes() => {
            let code = stored_code(value, encoder)?;
            encoder.decode(code).map(Cow::Borrowed)
        }
        _ => value.as_category(),
    }
}

/// Encode a set of raw fields with the artifact's frozen encodings.
///
/// Output length and order always equal `artifact.features()`.
pub fn encode<S>(source: &S, artifact: &ModelArtifact) -> EncodedFeatureVector
where
    S: FieldSource + ?Sized,
{
    let features = artifact.features();
    let mut values = Vec::with_capacity(features.len());
    let mut fallbacks = Vec::new();

    let slots = artifact.symptom_slots();
    let reported: HashSet<String> = category_text(source, SYMPTOMS_FIELD, artifact)
        .map(|text| split_symptoms(&text).iter().map(|s| normalize_key(s)).collect())
        .unwrap_or_default();
    let mut next_slot = slots.iter().peekable();

    for (position, feature) in features.iter().enumerate() {
        let slot = next_slot.next_if(|s| s.position == position);

        let value = if let Some(encoder) = artifact.encoder(feature) {
            let raw = category_text(source, feature, artifact);
            let category: &str = match &raw {
                Some(c) => c,
                None => {
                    fallbacks.push(EncodingFallback::Missing {
                        feature: feature.clone(),
                    });
                    UNKNOWN_CATEGORY
                }
            };
            match encoder.encode(category) {
                Some(code) => code as f64,
                None => {
                    if raw.is_some() {
                        fallbacks.push(EncodingFallback::UnseenCategory {
                            feature: feature.clone(),
                        });
                    }
                    SENTINEL_CODE
                }
            }
        } else if let Some(slot) = slot {
            // A row may carry the flag column itself; otherwise derive it from the text.
            match source.field(feature).and_then(RawValue::as_number) {
                Some(flag) => f64::from(u8::from(flag > 0.0)),
                None => f64::from(u8::from(reported.contains(&slot.key))),
            }
        } else {
            match source.field(feature) {
                None => {
                    fallbacks.push(EncodingFallback::Missing {
                        feature: feature.clone(),
                    });
                    0.0
                }
                Some(raw) => match raw.as_number() {
                    Some(n) => n,
                    None => {
                        let level = (feature == SEVERITY_FIELD)
                            .then(|| raw.as_text().and_then(severity_level))
                            .flatten();
                        level.unwrap_or_else(|| {
                            fallbacks.push(EncodingFallback::NotNumeric {
                                feature: feature.clone(),
                            });
                            0.0
                        })
                    }
                },
            }
        };
        values.push(value);
    }

    if !slots.is_empty() {
        let known: HashSet<&str> = slots.iter().map(|s| s.key.as_str()).collect();
        let mut unknown: Vec<&String> = reported
            .iter()
            .filter(|label| !known.contains(label.as_str()))
            .collect();
        unknown.sort();
        fallbacks.extend(
            unknown
                .into_iter()
                .map(|label| EncodingFallback::UnknownSymptom {
                    label: label.clone(),
                }),
        );
    }

    EncodedFeatureVector { values, fallbacks }
}
