//! Runtime configuration.
//!
//! Every setting has a default and may be overridden from the environment.
//! Invalid values are ignored and the default is kept.

use std::path::PathBuf;

use super::medicine::MedicinePolicy;
use super::normalizer::NormalizationStrategy;
use super::selector::{SelectionParams, SelectionPolicy};

const DEFAULT_JITTER: f64 = 0.1;

/// Prediction pipeline settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub selection: SelectionParams,
    pub normalization: NormalizationStrategy,
    pub medicine: MedicinePolicy,
    /// Fixed seed for `predict`; `None` draws from OS entropy per call
    pub rng_seed: Option<u64>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            selection: SelectionParams::default(),
            normalization: NormalizationStrategy::Linear,
            medicine: MedicinePolicy::RowValues,
            rng_seed: None,
        }
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl PredictorConfig {
    /// Load from the environment, keeping defaults for unset or invalid values.
    ///
    /// Supported:
    /// - CWA_TOP_N
    /// - CWA_NEIGHBOR_K
    /// - CWA_SELECTION_POLICY=nearest|context
    /// - CWA_CONFIDENCE_FLOOR (unset = linear normalization)
    /// - CWA_CONFIDENCE_JITTER
    /// - CWA_MEDICINE_POLICY=row|static
    /// - CWA_RNG_SEED
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env_or_default`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("CWA_TOP_N") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.selection.top_n = n;
                }
            }
        }

        if let Some(v) = lookup("CWA_NEIGHBOR_K") {
            if let Ok(k) = v.trim().parse::<usize>() {
                if k > 0 {
                    cfg.selection.neighbor_k = k;
                }
            }
        }

        if let Some(v) = lookup("CWA_SELECTION_POLICY") {
            match v.trim().to_ascii_lowercase().as_str() {
                "nearest" => cfg.selection.policy = SelectionPolicy::NearestRow,
                "context" => cfg.selection.policy = SelectionPolicy::ContextTopK,
                other => tracing::warn!("Ignoring unknown CWA_SELECTION_POLICY {:?}", other),
            }
        }

        if let Some(v) = lookup("CWA_CONFIDENCE_FLOOR") {
            if let Ok(floor) = v.trim().parse::<f64>() {
                if (0.0..=1.0).contains(&floor) {
                    let jitter = lookup("CWA_CONFIDENCE_JITTER")
                        .and_then(|j| j.trim().parse::<f64>().ok())
                        .filter(|j| j.is_finite() && *j >= 0.0)
                        .unwrap_or(DEFAULT_JITTER);
                    cfg.normalization = NormalizationStrategy::floor(floor, jitter);
                }
            }
        }

        if let Some(v) = lookup("CWA_MEDICINE_POLICY") {
            match v.trim().to_ascii_lowercase().as_str() {
                "row" => cfg.medicine = MedicinePolicy::RowValues,
                "static" => cfg.medicine = MedicinePolicy::StaticTable,
                other => tracing::warn!("Ignoring unknown CWA_MEDICINE_POLICY {:?}", other),
            }
        }

        if let Some(v) = lookup("CWA_RNG_SEED") {
            if let Ok(seed) = v.trim().parse::<u64>() {
                cfg.rng_seed = Some(seed);
            }
        }

        cfg
    }
}

/// Where the artifact and dataset live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub artifact_path: PathBuf,
    pub dataset_path: PathBuf,
    /// Refuse to load unless a manifest binds the artifact
    pub require_manifest: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("models/cwa_artifact.json"),
            dataset_path: PathBuf::from("models/cwa_dataset.csv"),
            require_manifest: false,
        }
    }
}

impl StoreConfig {
    /// Supported: CWA_ARTIFACT_PATH, CWA_DATASET_PATH, CWA_REQUIRE_MANIFEST.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(p) = lookup("CWA_ARTIFACT_PATH").filter(|p| !p.trim().is_empty()) {
            cfg.artifact_path = PathBuf::from(p.trim());
        }
        if let Some(p) = lookup("CWA_DATASET_PATH").filter(|p| !p.trim().is_empty()) {
            cfg.dataset_path = PathBuf::from(p.trim());
        }
        cfg.require_manifest = lookup("CWA_REQUIRE_MANIFEST")
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        cfg
    }
}
