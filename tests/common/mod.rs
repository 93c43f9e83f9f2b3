//! Shared fixtures: seeded random ensembles and small hand-built artifacts

#![allow(dead_code)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use risk_forest::export::{NodeValues, TrainedEnsemble, TrainedTree};
use risk_forest::preprocessing::{RawValue, StandardScaler};
use std::collections::BTreeMap;

pub const FEATURES: [&str; 6] = ["Latitude", "Longitude", "District", "Attribute 1", "Attribute 2", "Rainfall"];

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Grow a random tree in depth-first preorder, with parent counts equal to
/// the sum of their children like a fitted tree
pub fn random_tree(rng: &mut ChaCha8Rng, n_features: usize, n_classes: usize, max_depth: usize) -> TrainedTree {
    let mut tree = TrainedTree {
        children_left: Vec::new(),
        children_right: Vec::new(),
        feature: Vec::new(),
        threshold: Vec::new(),
        value: NodeValues::Flat(Vec::new()),
    };
    let mut values = Vec::new();
    grow(rng, &mut tree, &mut values, 0, max_depth, n_features, n_classes);
    tree.value = NodeValues::PerOutput(values.into_iter().map(|v| vec![v]).collect());
    tree
}

fn grow(
    rng: &mut ChaCha8Rng,
    tree: &mut TrainedTree,
    values: &mut Vec<Vec<f64>>,
    depth: usize,
    max_depth: usize,
    n_features: usize,
    n_classes: usize,
) -> (usize, Vec<f64>) {
    let id = tree.children_left.len();
    tree.children_left.push(-1);
    tree.children_right.push(-1);
    tree.feature.push(-2);
    tree.threshold.push(-2.0);
    values.push(Vec::new());

    let is_leaf = depth >= max_depth || (depth > 0 && rng.gen_bool(0.3));
    let counts = if is_leaf {
        let mut counts: Vec<f64> = (0..n_classes).map(|_| rng.gen_range(0u32..20) as f64).collect();
        counts[rng.gen_range(0..n_classes)] += 1.0;
        counts
    } else {
        let (left, left_counts) = grow(rng, tree, values, depth + 1, max_depth, n_features, n_classes);
        let (right, right_counts) = grow(rng, tree, values, depth + 1, max_depth, n_features, n_classes);
        tree.children_left[id] = left as i64;
        tree.children_right[id] = right as i64;
        tree.feature[id] = rng.gen_range(0..n_features) as i64;
        tree.threshold[id] = rng.gen_range(-2.0..2.0);
        left_counts.iter().zip(&right_counts).map(|(a, b)| a + b).collect()
    };
    values[id] = counts.clone();
    (id, counts)
}

/// Hazard ensemble over the usual request features, with categorical columns
pub fn hazard_ensemble(seed: u64, n_trees: usize) -> TrainedEnsemble {
    let mut rng = rng(seed);
    let mut encoders = BTreeMap::new();
    encoders.insert(
        "District".to_string(),
        ["Astore", "Ghanche", "Gilgit", "Hunza", "Unknown"].iter().map(|s| RawValue::from(*s)).collect(),
    );
    encoders.insert(
        "Attribute 1".to_string(),
        ["Cloudburst", "Glacier Melting", "River Flood", "Unknown"].iter().map(|s| RawValue::from(*s)).collect(),
    );
    encoders.insert(
        "Attribute 2".to_string(),
        ["Glacier Melting", "Heavy Rainfall", "Unknown"].iter().map(|s| RawValue::from(*s)).collect(),
    );

    let scaler = StandardScaler::new(
        vec![35.8, 75.0, 2.0, 1.5, 1.0, 25.0],
        vec![0.6, 1.1, 1.4, 1.1, 0.8, 30.0],
        FEATURES.len(),
    )
    .unwrap();

    let estimators = (0..n_trees)
        .map(|_| random_tree(&mut rng, FEATURES.len(), 3, 6))
        .collect();

    TrainedEnsemble {
        features: FEATURES.iter().map(|s| s.to_string()).collect(),
        classes: vec![RawValue::from("Flood"), RawValue::from("GLOF"), RawValue::from("Landslide")],
        scaler,
        encoders,
        estimators,
    }
}

/// Config that feeds the rainfall reading into the `Rainfall` column of [`hazard_ensemble`]
pub fn reading_config() -> risk_forest::inference::InferenceConfig {
    risk_forest::inference::InferenceConfig::default().with_reading_features(
        risk_forest::inference::ReadingFeatures {
            rainfall: Some("Rainfall".to_string()),
            ..Default::default()
        },
    )
}

/// One feature "X", one stump: `X <= 0` → A, else B
pub fn x_ensemble_json() -> &'static str {
    r#"{
        "features": ["X"],
        "classes": ["A", "B"],
        "scaler": {"mean_": [0.0], "scale_": [1.0]},
        "estimators": [{
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [0, -2, -2],
            "threshold": [0.0, -2.0, -2.0],
            "value": [[[4.0, 4.0]], [[4.0, 0.0]], [[0.0, 4.0]]]
        }]
    }"#
}

/// Minimal valid artifact document as a JSON value, for mutation in tests
pub fn stump_artifact_value() -> serde_json::Value {
    serde_json::json!({
        "features": ["X", "District"],
        "classes": ["A", "B"],
        "scaler": {"mean": [0.0, 0.0], "scale": [1.0, 1.0]},
        "encoders": {"District": ["Gilgit", "Hunza"]},
        "forest": [{
            "left": [1, -1, -1],
            "right": [2, -1, -1],
            "feature": [0, -2, -2],
            "threshold": [0.0, -2.0, -2.0],
            "value": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
        }]
    })
}

/// A random request around the Gilgit-Baltistan region
pub fn random_request(rng: &mut ChaCha8Rng) -> risk_forest::inference::PredictionRequest {
    let districts = ["Astore", "Gilgit", "Hunza", "Atlantis"];
    let mut request = risk_forest::inference::PredictionRequest::new(rng.gen_range(34.5..37.0), rng.gen_range(72.5..77.5));
    if rng.gen_bool(0.7) {
        request.rainfall = Some(rng.gen_range(0.0..120.0));
    }
    if rng.gen_bool(0.5) {
        request.river_level = Some(rng.gen_range(0.0..30.0));
    }
    if rng.gen_bool(0.6) {
        request.district = Some(districts[rng.gen_range(0..districts.len())].to_string());
    }
    request
}
