//! Integration test: export → save → load → predict
//! Tests: agreement with direct ensemble evaluation, leaf normalization, atomic writes

mod common;

use rand::prelude::*;
use risk_forest::error::RiskForestError;
use risk_forest::export::{ForestExporter, TrainedEnsemble};
use risk_forest::inference::{
    FeatureVectorBuilder, InferenceConfig, InferenceEngine, PredictionRequest, ReadingFeatures,
};
use risk_forest::model::ModelArtifact;

const TOLERANCE: f64 = 1e-9;

fn export_and_reload(ensemble: &TrainedEnsemble) -> (tempfile::TempDir, std::path::PathBuf, ModelArtifact) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let exported = ForestExporter::new().export(ensemble).unwrap();
    exported.save(&path).unwrap();
    let loaded = ModelArtifact::from_path(&path).unwrap();
    assert_eq!(exported, loaded);
    (dir, path, loaded)
}

// ============================================================================
// Agreement with the trained ensemble
// ============================================================================

#[test]
fn test_roundtrip_matches_direct_evaluation() {
    let ensemble = common::hazard_ensemble(7, 25);
    let (_dir, _path, artifact) = export_and_reload(&ensemble);
    let mut rng = common::rng(11);

    for _ in 0..500 {
        let x: Vec<f64> = (0..common::FEATURES.len()).map(|_| rng.gen_range(-3.0..3.0)).collect();
        let expected = ensemble.predict_proba(&x).unwrap();
        let actual = artifact.forest().predict_proba(&x).unwrap();
        for (e, a) in expected.iter().zip(&actual) {
            assert!((e - a).abs() < TOLERANCE, "expected {:?}, got {:?}", expected, actual);
        }
    }
}

#[test]
fn test_roundtrip_through_requests() {
    let ensemble = common::hazard_ensemble(3, 15);
    let (_dir, path, artifact) = export_and_reload(&ensemble);
    let config = common::reading_config();
    let engine = InferenceEngine::new(config.clone());
    engine.load(&path).unwrap();
    let builder = FeatureVectorBuilder::new(&artifact, &config);
    let mut rng = common::rng(5);

    for _ in 0..200 {
        let request = common::random_request(&mut rng);
        let vector = builder.build(&request).unwrap();
        let expected = ensemble.predict_proba(&vector).unwrap();
        let result = engine.predict(&request).unwrap();

        for (e, a) in expected.iter().zip(&result.probabilities) {
            assert!((e - a).abs() < TOLERANCE);
        }
        assert!(artifact.classes().contains(&result.class));
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}

#[test]
fn test_x_scenario() {
    let ensemble: TrainedEnsemble = serde_json::from_str(common::x_ensemble_json()).unwrap();
    let (_dir, path, artifact) = export_and_reload(&ensemble);

    assert_eq!(artifact.forest().predict_proba(&[-1.0]).unwrap(), vec![1.0, 0.0]);
    assert_eq!(artifact.forest().predict_proba(&[2.0]).unwrap(), vec![0.0, 1.0]);

    // drive "X" from the rainfall reading so the whole request path is exercised
    let config = InferenceConfig::default()
        .without_heuristics()
        .with_reading_features(ReadingFeatures {
            rainfall: Some("X".to_string()),
            river_level: None,
            soil_moisture: None,
        });
    let engine = InferenceEngine::new(config);
    engine.load(&path).unwrap();

    let low = engine.predict(&PredictionRequest::new(35.0, 74.0).with_rainfall(-1.0)).unwrap();
    assert_eq!(low.class, "A");
    assert_eq!(low.confidence, 1.0);

    let high = engine.predict(&PredictionRequest::new(35.0, 74.0).with_rainfall(2.0)).unwrap();
    assert_eq!(high.class, "B");
    assert_eq!(high.confidence, 1.0);
}

// ============================================================================
// Artifact shape
// ============================================================================

#[test]
fn test_exported_leaves_are_normalized() {
    let ensemble = common::hazard_ensemble(19, 10);
    let (_dir, path, _artifact) = export_and_reload(&ensemble);

    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let n_classes = doc["classes"].as_array().unwrap().len();
    let mut leaves = 0;

    for tree in doc["forest"].as_array().unwrap() {
        let left = tree["left"].as_array().unwrap();
        let value = tree["value"].as_array().unwrap();
        for (l, v) in left.iter().zip(value) {
            let v: Vec<f64> = v.as_array().unwrap().iter().map(|x| x.as_f64().unwrap()).collect();
            assert_eq!(v.len(), n_classes);
            let sum: f64 = v.iter().sum();
            if l.as_i64() == Some(-1) {
                leaves += 1;
                assert!((sum - 1.0).abs() < TOLERANCE || v.iter().all(|&p| p == 0.0));
            } else {
                assert_eq!(sum, 0.0, "internal nodes carry a zero vector");
            }
        }
    }
    assert!(leaves > 10);
}

#[test]
fn test_artifact_is_self_describing() {
    let ensemble = common::hazard_ensemble(23, 4);
    let (_dir, path, _artifact) = export_and_reload(&ensemble);

    let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["features"][2], "District");
    assert_eq!(doc["classes"], serde_json::json!(["Flood", "GLOF", "Landslide"]));
    assert_eq!(doc["encoders"]["District"][0], "Astore");
    assert_eq!(doc["scaler"]["mean"].as_array().unwrap().len(), 6);
    assert_eq!(doc["forest"].as_array().unwrap().len(), 4);
}

// ============================================================================
// Failure leaves nothing behind
// ============================================================================

#[test]
fn test_failed_export_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trained.json");
    let output = dir.path().join("model.json");

    let mut ensemble = common::hazard_ensemble(1, 3);
    ensemble.estimators[1].feature[0] = 99;
    std::fs::write(&input, serde_json::to_string(&ensemble).unwrap()).unwrap();

    let err = ForestExporter::new().export_to_path(&input, &output).unwrap_err();
    assert!(matches!(err, RiskForestError::FormatError(_)));
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1, "no temporary files left");
}

#[test]
fn test_failed_export_keeps_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trained.json");
    let output = dir.path().join("model.json");

    let good = common::hazard_ensemble(2, 3);
    std::fs::write(&input, serde_json::to_string(&good).unwrap()).unwrap();
    ForestExporter::new().export_to_path(&input, &output).unwrap();
    let before = std::fs::read(&output).unwrap();

    let mut bad = good.clone();
    bad.scaler = risk_forest::preprocessing::StandardScaler::new(vec![0.0; 5], vec![1.0; 5], 5).unwrap();
    std::fs::write(&input, serde_json::to_string(&bad).unwrap()).unwrap();
    assert!(ForestExporter::new().export_to_path(&input, &output).is_err());

    assert_eq!(std::fs::read(&output).unwrap(), before);
}

#[test]
fn test_missing_trained_model() {
    let dir = tempfile::tempdir().unwrap();
    let err = ForestExporter::new()
        .export_to_path(dir.path().join("nope.json"), dir.path().join("model.json"))
        .unwrap_err();
    assert!(matches!(err, RiskForestError::NotFound(_)));
}

#[test]
fn test_malformed_trained_model() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trained.json");
    std::fs::write(&input, "{\"features\": [").unwrap();
    let err = ForestExporter::new()
        .export_to_path(&input, dir.path().join("model.json"))
        .unwrap_err();
    assert!(matches!(err, RiskForestError::FormatError(_)));
}
