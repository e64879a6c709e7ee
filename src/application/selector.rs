//! Candidate selector: picks the reference case that best matches an observation.
//!
//! Two policies:
//! - `NearestRow`: restrict rows to the top-N agents by raw score and return
//!   the row closest to the observation (first row in dataset order on ties).
//! - `ContextTopK`: additionally restrict rows to the observation's bodily
//!   system (if it names one), then pick uniformly among the `k` closest rows.

use std::collections::{BTreeSet, HashSet};

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::encoder::EncodedFeatureVector;
use super::scorer::AgentScores;
use crate::domain::{normalize_key, DatasetRow, PatientObservation, ReferenceDataset};
use crate::TriageError;

/// Row selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    NearestRow,
    ContextTopK,
}

/// Parameters for [`select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionParams {
    pub policy: SelectionPolicy,
    /// Number of top-scoring agents whose rows stay in the candidate set
    pub top_n: usize,
    /// Neighbourhood size for `ContextTopK`
    pub neighbor_k: usize,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            top_n: 3,
            neighbor_k: 5,
        }
    }
}

/// Euclidean distance over the common prefix of two vectors.
#[must_use]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Select the matching reference row.
///
/// # Errors
/// Returns `TriageError::NoCandidate` if no row survives filtering.
pub fn select<'a, R>(
    observation: &PatientObservation,
    vector: &EncodedFeatureVector,
    scores: &AgentScores,
    dataset: &'a ReferenceDataset,
    params: &SelectionParams,
    rng: &mut R,
) -> Result<&'a DatasetRow, TriageError>
where
    R: Rng + ?Sized,
{
    let top: Vec<String> = scores
        .top(params.top_n)
        .into_iter()
        .map(|s| s.agent.clone())
        .collect();
    let top_keys: HashSet<String> = top.iter().map(|a| normalize_key(a)).collect();

    let ranked: Vec<(f64, &DatasetRow)> = dataset
        .rows()
        .iter()
        .filter(|row| top_keys.contains(row.agent_key()))
        .map(|row| (euclidean_distance(vector.values(), row.vector()), row))
        .collect();

    let mut candidates = match params.policy {
        SelectionPolicy::NearestRow => ranked,
        SelectionPolicy::ContextTopK => match context_key(observation, &ranked, rng) {
            Some(key) => ranked
                .into_iter()
                .filter(|(_, row)| row.system_key() == Some(key.as_str()))
                .collect(),
            None => ranked,
        },
    };

    tracing::debug!(
        "Selecting among {} candidate rows (policy={:?}, top_n={})",
        candidates.len(),
        params.policy,
        params.top_n
    );

    let chosen = match params.policy {
        SelectionPolicy::NearestRow => {
            let mut best: Option<(f64, &DatasetRow)> = None;
            for (distance, row) in candidates {
                // Strict comparison keeps the earliest row on ties.
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, row));
                }
            }
            best.map(|(_, row)| row)
        }
        SelectionPolicy::ContextTopK => {
            candidates.sort_by(|(da, ra), (db, rb)| {
                da.total_cmp(db).then(ra.position().cmp(&rb.position()))
            });
            candidates.truncate(params.neighbor_k.max(1));
            candidates.choose(rng).map(|(_, row)| *row)
        }
    };

    chosen.ok_or(TriageError::NoCandidate { agents: top })
}

/// System context to filter the agent-filtered candidates on.
///
/// `None` when the observation names no system. Otherwise the observation's
/// system if a candidate has it, else a uniformly random candidate system, so
/// the filter never empties a non-empty candidate set.
fn context_key<R>(
    observation: &PatientObservation,
    candidates: &[(f64, &DatasetRow)],
    rng: &mut R,
) -> Option<String>
where
    R: Rng + ?Sized,
{
    let key = normalize_key(&observation.system()?);
    let systems: BTreeSet<&str> = candidates
        .iter()
        .filter_map(|(_, row)| row.system_key())
        .collect();
    if systems.contains(key.as_str()) {
        return Some(key);
    }
    tracing::debug!("Requested system has no candidate rows, drawing a random one");
    systems.into_iter().choose(rng).map(str::to_string)
}
