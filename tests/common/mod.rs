//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use cwa_triage::adapters::estimators::{ConstantEstimator, LinearEstimator};
use cwa_triage::domain::{CategoricalEncoder, ModelArtifact, RawRecord, RawValue};

pub const FEATURES: [&str; 8] = [
    "gender",
    "human_system",
    "age",
    "oxygen",
    "severity",
    "sym_cough",
    "sym_wheezing",
    "sym_miosis",
];

pub const AGENTS: [&str; 4] = ["Chlorine", "Sarin", "Mustard", "Phosgene"];

pub fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| (*s).to_string()).collect()
}

/// Artifact with a constant 2.5 for Chlorine, a linear Sarin model and no
/// estimator for Phosgene.
pub fn artifact() -> ModelArtifact {
    let width = FEATURES.len();
    let mut sarin = vec![0.0; width];
    sarin[7] = 2.0;
    ModelArtifact::builder(strings(&FEATURES), strings(&AGENTS))
        .encoder(
            "gender",
            CategoricalEncoder::new(strings(&["female", "male"])).expect("encoder"),
        )
        .encoder(
            "human_system",
            CategoricalEncoder::new(strings(&["Nervous", "Respiratory", "Skin"])).expect("encoder"),
        )
        .estimator("Chlorine", Arc::new(ConstantEstimator::new(2.5, width)))
        .estimator("Sarin", Arc::new(LinearEstimator::new(sarin, 0.5)))
        .estimator("Mustard", Arc::new(ConstantEstimator::new(1.0, width)))
        .build()
        .expect("artifact")
}

pub fn record(pairs: &[(&str, RawValue)]) -> RawRecord {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Reference rows: one per agent except Phosgene, plus a second Sarin case.
pub fn records() -> Vec<RawRecord> {
    vec![
        record(&[
            ("agent", "Chlorine".into()),
            ("gender", "male".into()),
            ("human_system", "Respiratory".into()),
            ("symptoms", "cough, wheezing".into()),
            ("age", 38.0.into()),
            ("oxygen", 90.0.into()),
            ("severity", "Moderate".into()),
            ("methylprednisolone_mg_initial", 125.0.into()),
            ("albuterol_neb_mg_initial", 2.5.into()),
        ]),
        record(&[
            ("agent", "Sarin".into()),
            ("gender", "female".into()),
            ("human_system", "Nervous".into()),
            ("symptoms", "miosis, drooling".into()),
            ("age", 45.0.into()),
            ("oxygen", 95.0.into()),
            ("severity", "Severe".into()),
            ("atropine_mg_initial", 2.0.into()),
            ("pralidoxime_mg_initial", 1000.0.into()),
        ]),
        record(&[
            ("agent", "Sarin".into()),
            ("gender", "male".into()),
            ("human_system", "Nervous".into()),
            ("symptoms", "Miosis".into()),
            ("age", 30.0.into()),
            ("oxygen", 97.0.into()),
            ("severity", "Mild".into()),
            ("atropine_mg_initial", 4.0.into()),
        ]),
        record(&[
            ("agent", "Mustard".into()),
            ("gender", "female".into()),
            ("human_system", "Skin".into()),
            ("symptoms", "blisters".into()),
            ("age", 52.0.into()),
            ("oxygen", 96.0.into()),
            ("severity", "Moderate".into()),
        ]),
    ]
}

pub const ARTIFACT_JSON: &str = r#"{
    "version": 1,
    "trained_at": "2024-05-01T12:00:00Z",
    "features": ["gender", "human_system", "age", "sym_cough", "sym_miosis"],
    "agents": ["Chlorine", "Sarin"],
    "encoders": {
        "gender": {"classes": ["female", "male"]},
        "human_system": {"classes": ["Nervous", "Respiratory"]}
    },
    "estimators": {
        "Chlorine": {"kind": "linear", "coefficients": [0.0, 1.0, 0.0, 1.0, 0.0], "intercept": 0.5},
        "Sarin": {"kind": "forest", "trees": [
            {"nodes": [
                {"feature": 4, "threshold": 0.5, "left": 1, "right": 2},
                {"value": 0.5},
                {"value": 3.0}
            ]}
        ]}
    },
    "score_range": {"lo": 0.0, "hi": 3.0}
}"#;

pub const DATASET_CSV: &str = "agent,gender,human_system,symptoms,age,atropine_mg_initial,methylprednisolone_mg_initial
Chlorine,male,Respiratory,\"cough, wheezing\",40,,125
Sarin,female,Nervous,miosis,33,2,
";
