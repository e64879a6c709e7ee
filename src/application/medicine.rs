//! Medicine resolver: initial dosage recommendation for the selected case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    DatasetRow, DosageSet, DosageTable, ModelArtifact, RawValue, ReferenceDataset, DOSAGE_FIELDS,
};

/// Where dosages come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicinePolicy {
    /// Dosage columns of the selected reference row
    #[default]
    RowValues,
    /// Fixed per-agent table (from the artifact, or learned from the dataset)
    StaticTable,
}

/// Dosages read off a reference row. Missing or non-numeric cells are 0.
#[must_use]
pub fn from_row(row: &DatasetRow) -> DosageSet {
    DosageSet::from_fn(|field| row.value(field).and_then(RawValue::as_number))
}

/// Dosages for an agent from a static table; all zero if the agent is absent.
#[must_use]
pub fn from_table(table: &DosageTable, agent: &str) -> DosageSet {
    table.get(agent).cloned().unwrap_or_default()
}

/// Per-agent mean of the dosage columns over the reference rows.
///
/// Missing cells count as 0. Agents keep their first-seen spelling.
#[must_use]
pub fn learn_table(dataset: &ReferenceDataset) -> DosageTable {
    let mut sums: BTreeMap<&str, (&str, usize, [f64; DOSAGE_FIELDS.len()])> = BTreeMap::new();
    for row in dataset.rows() {
        let entry = sums
            .entry(row.agent_key())
            .or_insert((row.agent(), 0, [0.0; DOSAGE_FIELDS.len()]));
        entry.1 += 1;
        let dosage = from_row(row);
        for (slot, field) in entry.2.iter_mut().zip(DOSAGE_FIELDS) {
            *slot += dosage.get(field);
        }
    }

    let mut table = DosageTable::default();
    for (agent, count, totals) in sums.into_values() {
        let dosage = DosageSet::from_fn(|field| {
            DOSAGE_FIELDS
                .iter()
                .position(|f| *f == field)
                .map(|i| totals[i] / count as f64)
        });
        table.insert(agent, dosage);
    }
    table
}

/// Resolves dosages under a fixed policy.
#[derive(Debug, Clone)]
pub struct MedicineResolver {
    policy: MedicinePolicy,
    table: Option<DosageTable>,
}

impl MedicineResolver {
    /// Set up the resolver once at load time.
    ///
    /// Under `StaticTable`, the artifact's table wins; without one the table
    /// is learned from the dataset.
    #[must_use]
    pub fn new(policy: MedicinePolicy, artifact: &ModelArtifact, dataset: &ReferenceDataset) -> Self {
        let table = match policy {
            MedicinePolicy::RowValues => None,
            MedicinePolicy::StaticTable => Some(match artifact.dosage_table() {
                Some(table) => table.clone(),
                None => {
                    let learned = learn_table(dataset);
                    tracing::info!(
                        "Learned static dosage table for {} agents from reference rows",
                        learned.len()
                    );
                    learned
                }
            }),
        };
        Self { policy, table }
    }

    #[must_use]
    pub fn policy(&self) -> MedicinePolicy {
        self.policy
    }

    /// Dosages for the selected row. Always carries the full dosage field set.
    #[must_use]
    pub fn resolve(&self, row: &DatasetRow) -> DosageSet {
        match &self.table {
            Some(table) => from_table(table, row.agent()),
            None => from_row(row),
        }
    }
}
