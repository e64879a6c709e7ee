//! Estimator port: Trait for trained per-agent scoring models.
//!
//! This trait abstracts the model family (linear, tree ensemble, ...) from
//! the scoring pipeline.

use std::fmt;

/// A trained model mapping an encoded feature vector to a scalar score for one agent.
///
/// Implementations must be pure: the same vector always yields the same score,
/// and no shared mutable state is touched.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Number of input features this estimator was trained against.
    fn n_features(&self) -> usize;

    /// Score an encoded feature vector.
    ///
    /// # Arguments
    /// * `features` - Vector in canonical feature order, of length `n_features()`
    fn predict(&self, features: &[f64]) -> f64;
}
