//! Reference dataset types.
//!
//! Each row is one historical exposure case. Rows keep their raw source
//! record untouched and carry derived lookup columns (normalized agent and
//! system names, the encoded feature vector) computed once at load time.

use std::collections::BTreeMap;

use super::observation::{normalize_key, RawRecord, RawValue, AGENT_FIELD, SYSTEM_FIELD};

/// One reference case.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    position: usize,
    agent: String,
    agent_key: String,
    system_key: Option<String>,
    record: RawRecord,
    vector: Vec<f64>,
}

impl DatasetRow {
    /// Create a row from its raw record and its encoded canonical vector.
    ///
    /// Returns `None` if the record has no agent label.
    #[must_use]
    pub fn new(position: usize, record: RawRecord, vector: Vec<f64>) -> Option<Self> {
        let agent = record
            .get(AGENT_FIELD)
            .and_then(RawValue::as_category)?
            .into_owned();
        let agent_key = normalize_key(&agent);
        let system_key = record
            .get(SYSTEM_FIELD)
            .and_then(RawValue::as_category)
            .map(|s| normalize_key(&s));

        Some(Self {
            position,
            agent,
            agent_key,
            system_key,
            record,
            vector,
        })
    }

    /// Position in dataset order.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Agent label as written in the dataset.
    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Case-folded, trimmed agent label.
    #[must_use]
    pub fn agent_key(&self) -> &str {
        &self.agent_key
    }

    /// Case-folded, trimmed system label, if the row has one.
    #[must_use]
    pub fn system_key(&self) -> Option<&str> {
        self.system_key.as_deref()
    }

    /// The untouched source record.
    #[must_use]
    pub fn record(&self) -> &RawRecord {
        &self.record
    }

    /// Raw value of a source column.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&RawValue> {
        self.record.get(column)
    }

    /// Canonical feature vector, encoded with the artifact's encoders.
    #[must_use]
    pub fn vector(&self) -> &[f64] {
        &self.vector
    }
}

/// Ordered, read-only collection of reference cases.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    rows: Vec<DatasetRow>,
    systems: BTreeMap<String, String>,
}

impl ReferenceDataset {
    /// Freeze a list of rows. Rows are re-numbered in the given order.
    #[must_use]
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        let mut rows = rows;
        let mut systems = BTreeMap::new();
        for (i, row) in rows.iter_mut().enumerate() {
            row.position = i;
            if let (Some(key), Some(display)) = (
                row.system_key.clone(),
                row.record.get(SYSTEM_FIELD).and_then(RawValue::as_category),
            ) {
                systems.entry(key).or_insert_with(|| display.into_owned());
            }
        }
        Self { rows, systems }
    }

    #[must_use]
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose agent matches `agent` (case-insensitive, trimmed), in dataset order.
    pub fn rows_for_agent<'a>(&'a self, agent: &str) -> impl Iterator<Item = &'a DatasetRow> + 'a {
        let key = normalize_key(agent);
        self.rows.iter().filter(move |r| r.agent_key == key)
    }

    /// Known system keys (case-folded) mapped to their first-seen display text.
    #[must_use]
    pub fn systems(&self) -> &BTreeMap<String, String> {
        &self.systems
    }
}
