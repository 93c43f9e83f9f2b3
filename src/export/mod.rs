//! Forest export
//!
//! Converts a [`TrainedEnsemble`] into a self-describing [`ModelArtifact`]:
//! - tree structure copied verbatim
//! - per-node class counts normalized into probabilities
//! - scaler and category lists carried alongside
//!
//! The artifact is validated exactly as it will be at load time before any
//! byte is written, and files are replaced atomically.

mod ensemble;

pub use ensemble::{NodeValues, TrainedEnsemble, TrainedTree};

use crate::error::{RiskForestError, Result};
use crate::model::{normalize_counts, ModelArtifact, TreeDocument};
use crate::preprocessing::{CategoryEncoders, RawValue};
use std::path::Path;
use tracing::{debug, info};

/// Exports trained ensembles into model artifacts
#[derive(Debug, Clone, Default)]
pub struct ForestExporter;

impl ForestExporter {
    pub fn new() -> Self {
        Self
    }

    /// Build a validated artifact from a trained ensemble
    pub fn export(&self, ensemble: &TrainedEnsemble) -> Result<ModelArtifact> {
        let classes = ensemble.class_labels();
        let n_classes = classes.len();

        if ensemble.estimators.is_empty() {
            return Err(RiskForestError::format("ensemble has no estimators"));
        }

        let forest = ensemble
            .estimators
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                let doc = flatten_tree(tree, n_classes)
                    .map_err(|e| RiskForestError::format(format!("estimator {}: {}", i, e)))?;
                debug!(estimator = i, nodes = doc.left.len(), "tree flattened");
                Ok(doc)
            })
            .collect::<Result<Vec<_>>>()?;

        let encoders: CategoryEncoders = ensemble
            .encoders
            .iter()
            .map(|(name, categories)| {
                (name.clone(), categories.iter().map(RawValue::category_key).collect())
            })
            .collect();

        let artifact = ModelArtifact::new(
            ensemble.features.clone(),
            classes,
            ensemble.scaler.clone(),
            encoders,
            forest,
        )?;

        info!(
            trees = artifact.forest().n_trees(),
            features = artifact.features().len(),
            classes = artifact.classes().len(),
            encoders = artifact.encoders().len(),
            "ensemble exported"
        );
        Ok(artifact)
    }

    /// Read a trained-ensemble dump from `input` and write the artifact to `output`.
    ///
    /// On any error `output` is left untouched.
    pub fn export_to_path(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ModelArtifact> {
        let ensemble = TrainedEnsemble::from_path(input.as_ref())?;
        let artifact = self.export(&ensemble)?;
        artifact.save(output.as_ref())?;
        info!(path = %output.as_ref().display(), "artifact written");
        Ok(artifact)
    }
}

/// Copy the structure arrays and normalize each node's class counts
fn flatten_tree(tree: &TrainedTree, n_classes: usize) -> std::result::Result<TreeDocument, String> {
    let n = tree.check_shape(n_classes).map_err(|e| describe(&e))?;
    let value = (0..n)
        .map(|node| tree.value.counts(node).map(normalize_counts))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| describe(&e))?;

    Ok(TreeDocument {
        left: tree.children_left.clone(),
        right: tree.children_right.clone(),
        feature: tree.feature.clone(),
        threshold: tree.threshold.clone(),
        value,
    })
}

fn describe(err: &RiskForestError) -> String {
    match err {
        RiskForestError::FormatError(msg) => msg.clone(),
        other => other.to_string(),
    }
}
