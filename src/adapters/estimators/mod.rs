//! Estimator adapters: Concrete model families behind the `Estimator` port.
//!
//! The artifact stores each agent's estimator as a tagged JSON object:
//!
//! ```json
//! { "kind": "linear",   "coefficients": [0.1, -0.3], "intercept": 1.2 }
//! { "kind": "forest",   "trees": [ { "nodes": [ ... ] } ] }
//! { "kind": "constant", "value": 2.0 }
//! ```
//!
//! Forest trees are flat node arrays. A split node sends a vector left when
//! `x[feature] <= threshold`. Child indices must point forward so every walk
//! terminates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::Estimator;

/// Serialized estimator, as exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    Forest {
        trees: Vec<RegressionTree>,
    },
    Constant {
        value: f64,
    },
}

impl EstimatorSpec {
    /// Instantiate the estimator for a model with `n_features` canonical features.
    ///
    /// # Errors
    /// Returns a description of the problem if parameters are non-finite or a
    /// tree is malformed. Width mismatches of linear models are left to the
    /// artifact's shape check.
    pub fn build(self, n_features: usize) -> Result<Arc<dyn Estimator>, String> {
        match self {
            Self::Linear {
                coefficients,
                intercept,
            } => {
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear parameters must be finite".into());
                }
                Ok(Arc::new(LinearEstimator {
                    coefficients,
                    intercept,
                }))
            }
            Self::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest has no trees".into());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features)
                        .map_err(|e| format!("tree {i}: {e}"))?;
                }
                Ok(Arc::new(ForestEstimator { trees, n_features }))
            }
            Self::Constant { value } => {
                if !value.is_finite() {
                    return Err("constant value must be finite".into());
                }
                Ok(Arc::new(ConstantEstimator { value, n_features }))
            }
        }
    }
}

/// `intercept + Σ cᵢ·xᵢ`.
#[derive(Debug, Clone)]
pub struct LinearEstimator {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearEstimator {
    #[must_use]
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }
}

impl Estimator for LinearEstimator {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// A node of a flat regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A single regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} is not finite"));
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if x <= *threshold { *left } else { *right };
                }
                // Unreachable for validated trees.
                None => return 0.0,
            }
        }
    }
}

/// Mean of the member trees' outputs.
#[derive(Debug, Clone)]
pub struct ForestEstimator {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl Estimator for ForestEstimator {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

/// Always returns the same score.
#[derive(Debug, Clone)]
pub struct ConstantEstimator {
    value: f64,
    n_features: usize,
}

impl ConstantEstimator {
    #[must_use]
    pub fn new(value: f64, n_features: usize) -> Self {
        Self { value, n_features }
    }
}

impl Estimator for ConstantEstimator {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, _features: &[f64]) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, lo: f64, hi: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: lo },
                TreeNode::Leaf { value: hi },
            ],
        }
    }

    #[test]
    fn test_linear_predict() {
        let est = EstimatorSpec::Linear {
            coefficients: vec![0.5, -1.0],
            intercept: 1.0,
        }
        .build(2)
        .expect("Should build");

        assert_eq!(est.n_features(), 2);
        assert!((est.predict(&[2.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_averages_trees() {
        let est = EstimatorSpec::Forest {
            trees: vec![stump(0, 50.0, 1.0, 3.0), stump(1, 0.5, 2.0, 3.0)],
        }
        .build(2)
        .expect("Should build");

        assert!((est.predict(&[40.0, 0.0]) - 1.5).abs() < 1e-12);
        assert!((est.predict(&[60.0, 1.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_rejects_malformed_trees() {
        let out_of_range = EstimatorSpec::Forest {
            trees: vec![stump(5, 1.0, 0.0, 1.0)],
        };
        assert!(out_of_range.build(2).is_err());

        let backwards = EstimatorSpec::Forest {
            trees: vec![RegressionTree {
                nodes: vec![TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                }],
            }],
        };
        assert!(backwards.build(1).is_err());

        assert!(EstimatorSpec::Forest { trees: vec![] }.build(1).is_err());
    }

    #[test]
    fn test_spec_json_format() {
        let json = r#"{
            "kind": "forest",
            "trees": [{"nodes": [
                {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
                {"value": 1.0},
                {"value": 2.5}
            ]}]
        }"#;
        let spec: EstimatorSpec = serde_json::from_str(json).expect("Should parse");
        let est = spec.build(1).expect("Should build");
        assert!((est.predict(&[2.0]) - 2.5).abs() < 1e-12);

        let constant: EstimatorSpec =
            serde_json::from_str(r#"{"kind": "constant", "value": 2.0}"#).expect("Should parse");
        assert_eq!(constant.build(4).expect("Should build").n_features(), 4);
    }
}
