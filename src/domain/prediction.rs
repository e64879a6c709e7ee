//! Prediction output types.
//!
//! Represents the agent match returned to the caller together with the
//! initial dosage recommendation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::observation::normalize_key;

/// The fixed collection of medication-amount fields returned with every prediction.
pub const DOSAGE_FIELDS: [&str; 7] = [
    "atropine_mg_initial",
    "pralidoxime_mg_initial",
    "diazepam_mg_initial",
    "hydroxocobalamin_g_initial",
    "methylprednisolone_mg_initial",
    "albuterol_neb_mg_initial",
    "dimercaprol_BAL_mg_initial",
];

/// Dosage field → amount. Always carries exactly the keys in [`DOSAGE_FIELDS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct DosageSet {
    amounts: BTreeMap<String, f64>,
}

impl DosageSet {
    /// Every field at 0.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::from_fn(|_| None)
    }

    /// Build from a per-field lookup. Fields the lookup cannot supply
    /// (or supplies as a non-finite number) are 0.
    pub fn from_fn<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let amounts = DOSAGE_FIELDS
            .iter()
            .map(|field| {
                let amount = lookup(field).filter(|v| v.is_finite()).unwrap_or(0.0);
                ((*field).to_string(), amount)
            })
            .collect();
        Self { amounts }
    }

    /// Amount for a dosage field (0 for fields outside the fixed set).
    #[must_use]
    pub fn get(&self, field: &str) -> f64 {
        self.amounts.get(field).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.amounts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for DosageSet {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl From<BTreeMap<String, f64>> for DosageSet {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        Self::from_fn(|field| raw.get(field).copied())
    }
}

impl From<DosageSet> for BTreeMap<String, f64> {
    fn from(set: DosageSet) -> Self {
        set.amounts
    }
}

/// Context-independent per-agent dosage recommendations.
///
/// Keys are matched case-insensitively after trimming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, DosageSet>",
    into = "BTreeMap<String, DosageSet>"
)]
pub struct DosageTable {
    entries: BTreeMap<String, (String, DosageSet)>,
}

impl DosageTable {
    pub fn insert(&mut self, agent: impl Into<String>, dosage: DosageSet) {
        let agent = agent.into();
        self.entries.insert(normalize_key(&agent), (agent, dosage));
    }

    #[must_use]
    pub fn get(&self, agent: &str) -> Option<&DosageSet> {
        self.entries.get(&normalize_key(agent)).map(|(_, d)| d)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, DosageSet>> for DosageTable {
    fn from(raw: BTreeMap<String, DosageSet>) -> Self {
        let mut table = Self::default();
        for (agent, dosage) in raw {
            table.insert(agent, dosage);
        }
        table
    }
}

impl From<DosageTable> for BTreeMap<String, DosageSet> {
    fn from(table: DosageTable) -> Self {
        table.entries.into_values().collect()
    }
}

/// Result of one prediction call. Produced fresh per call; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Agent label of the selected reference case
    pub predicted_agent: String,

    /// Confidence in [0, 1], rounded to two decimals
    pub score: f64,

    /// Initial dosage recommendation
    pub medicine: DosageSet,
}
