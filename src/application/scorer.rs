//! Agent scorer: runs every agent's estimator over one encoded vector.

use super::encoder::EncodedFeatureVector;
use crate::domain::{normalize_key, ModelArtifact};

/// Where a raw score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Estimator,
    /// No estimator for the agent; scored 0.
    MissingEstimator,
    /// Estimator produced NaN or infinity; scored 0.
    NonFiniteOutput,
}

/// Raw relevance score for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentScore {
    pub agent: String,
    pub raw: f64,
    pub source: ScoreSource,
}

/// Scores for every artifact agent, in artifact agent order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentScores {
    scores: Vec<AgentScore>,
}

impl AgentScores {
    /// Build from `(agent, raw)` pairs; every entry is marked as estimator output.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let scores = pairs
            .into_iter()
            .map(|(agent, raw)| AgentScore {
                agent: agent.into(),
                raw,
                source: ScoreSource::Estimator,
            })
            .collect();
        Self { scores }
    }

    /// Score for an agent, matched exactly first and then case-insensitively.
    #[must_use]
    pub fn get(&self, agent: &str) -> Option<&AgentScore> {
        self.scores.iter().find(|s| s.agent == agent).or_else(|| {
            let key = normalize_key(agent);
            self.scores.iter().find(|s| normalize_key(&s.agent) == key)
        })
    }

    /// The `n` highest-scoring agents. Ties keep artifact agent order.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<&AgentScore> {
        let mut ranked: Vec<&AgentScore> = self.scores.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.raw.total_cmp(&a.raw));
        ranked.truncate(n);
        ranked
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentScore> {
        self.scores.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Score every agent in the artifact.
#[must_use]
pub fn score_all(vector: &EncodedFeatureVector, artifact: &ModelArtifact) -> AgentScores {
    let scores = artifact
        .agents()
        .iter()
        .map(|agent| {
            let (raw, source) = match artifact.estimator(agent) {
                None => (0.0, ScoreSource::MissingEstimator),
                Some(estimator) => {
                    let raw = estimator.predict(vector.values());
                    if raw.is_finite() {
                        (raw, ScoreSource::Estimator)
                    } else {
                        (0.0, ScoreSource::NonFiniteOutput)
                    }
                }
            };
            if source != ScoreSource::Estimator {
                tracing::debug!("Agent {} scored 0 ({:?})", agent, source);
            }
            AgentScore {
                agent: agent.clone(),
                raw,
                source,
            }
        })
        .collect();
    AgentScores { scores }
}
