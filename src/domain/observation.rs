//! Patient observation types.
//!
//! An observation is a loose mapping from feature name to a raw value, exactly
//! as it arrives from the caller. Nothing here knows about the trained model:
//! coercion to the model's representation happens in the feature encoder.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-text, comma-separated symptom list.
pub const SYMPTOMS_FIELD: &str = "symptoms";

/// Bodily system the presentation is attributed to (e.g. "Respiratory").
pub const SYSTEM_FIELD: &str = "human_system";

/// Causative agent label on reference rows.
pub const AGENT_FIELD: &str = "agent";

/// Clinical severity, recorded as words in the reference dataset.
pub const SEVERITY_FIELD: &str = "severity";

/// Prefix of the multi-hot symptom slots in the canonical feature list.
pub const SYMPTOM_SLOT_PREFIX: &str = "sym_";

/// Placeholder used for a categorical feature the caller did not supply.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A raw field value: text, number, boolean or explicit null.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Parse a tabular cell: empty is null, plain numbers become numbers,
    /// anything else is kept as text.
    #[must_use]
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// `true` for null and for blank text.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// String form used for categorical lookups.
    ///
    /// Returns `None` when the value is absent.
    #[must_use]
    pub fn as_category(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(Cow::Owned(b.to_string())),
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(t))
                }
            }
        }
    }

    /// Numeric form, if the value can be read as a finite number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Null => return None,
            Self::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(_) => write!(f, "Bool(..)"),
            Self::Number(_) => write!(f, "Number(..)"),
            Self::Text(_) => write!(f, "Text(..)"),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A row of raw values keyed by column name.
pub type RawRecord = BTreeMap<String, RawValue>;

/// Read access to named raw fields.
///
/// Implemented by inbound observations and by raw reference rows so both go
/// through the same encoder.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&RawValue>;

    /// Whether numbers on label-encoded fields are stored encoder codes.
    fn carries_codes(&self) -> bool {
        false
    }
}

/// Reference rows may store label-encoded columns as codes.
impl FieldSource for RawRecord {
    fn field(&self, name: &str) -> Option<&RawValue> {
        self.get(name).filter(|v| !v.is_absent())
    }

    fn carries_codes(&self) -> bool {
        true
    }
}

/// The inbound patient presentation.
///
/// `Debug` prints field names only; values are clinical data and stay out of logs.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientObservation {
    fields: RawRecord,
}

impl PatientObservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.field(name)
    }

    /// Categorical context (bodily system), if supplied.
    #[must_use]
    pub fn system(&self) -> Option<Cow<'_, str>> {
        self.get(SYSTEM_FIELD).and_then(RawValue::as_category)
    }

    /// Symptom labels from the comma-separated symptom text, trimmed, blanks dropped.
    #[must_use]
    pub fn symptom_labels(&self) -> Vec<String> {
        self.get(SYMPTOMS_FIELD)
            .and_then(RawValue::as_category)
            .map(|text| split_symptoms(&text))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldSource for PatientObservation {
    fn field(&self, name: &str) -> Option<&RawValue> {
        self.fields.field(name)
    }
}

impl From<RawRecord> for PatientObservation {
    fn from(fields: RawRecord) -> Self {
        Self { fields }
    }
}

impl fmt::Debug for PatientObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatientObservation")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Split comma-separated symptom text into trimmed, non-empty labels.
#[must_use]
pub fn split_symptoms(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-folded, trimmed key used for name matching.
#[must_use]
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}
