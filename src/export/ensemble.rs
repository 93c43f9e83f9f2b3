//! Trained ensemble as dumped by the training environment
//!
//! The dump mirrors the attributes of a fitted random-forest classifier:
//! per estimator the `children_left` / `children_right` / `feature` /
//! `threshold` arrays and the raw per-node class counts in `value`, plus the
//! fitted scaler, the per-column category lists and the label order.

use crate::error::{RiskForestError, Result};
use crate::model::tree::LEAF_SENTINEL;
use crate::preprocessing::{RawValue, StandardScaler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Per-node class counts, either `[node][output][class]` or `[node][class]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeValues {
    PerOutput(Vec<Vec<Vec<f64>>>),
    Flat(Vec<Vec<f64>>),
}

impl NodeValues {
    pub fn len(&self) -> usize {
        match self {
            NodeValues::PerOutput(v) => v.len(),
            NodeValues::Flat(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class counts of one node; only single-output trees are supported
    pub fn counts(&self, node: usize) -> Result<&[f64]> {
        match self {
            NodeValues::Flat(v) => Ok(&v[node]),
            NodeValues::PerOutput(v) => match v[node].as_slice() {
                [single] => Ok(single),
                outputs => Err(RiskForestError::format(format!(
                    "node {} has {} outputs; only single-output classifiers are supported",
                    node,
                    outputs.len()
                ))),
            },
        }
    }
}

/// One fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedTree {
    #[serde(alias = "left")]
    pub children_left: Vec<i64>,
    #[serde(alias = "right")]
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: NodeValues,
}

impl TrainedTree {
    /// Check that all per-node arrays agree and every count vector has `n_classes` entries
    pub fn check_shape(&self, n_classes: usize) -> Result<usize> {
        let n = self.children_left.len();
        let lengths = [
            ("children_right", self.children_right.len()),
            ("feature", self.feature.len()),
            ("threshold", self.threshold.len()),
            ("value", self.value.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(RiskForestError::format(format!(
                    "'children_left' has {} nodes but '{}' has {}",
                    n, name, len
                )));
            }
        }
        if n == 0 {
            return Err(RiskForestError::format("tree has no nodes"));
        }
        for node in 0..n {
            let counts = self.value.counts(node)?;
            if counts.len() != n_classes {
                return Err(RiskForestError::format(format!(
                    "node {} has {} class counts, expected {}",
                    node,
                    counts.len(),
                    n_classes
                )));
            }
        }
        Ok(n)
    }

    /// Class distribution of the leaf reached by `x`, normalized from raw counts
    fn leaf_distribution(&self, x: &[f64]) -> Result<Vec<f64>> {
        let n = self.children_left.len();
        let mut node = 0usize;
        // a well-formed tree reaches a leaf in fewer than n steps
        for _ in 0..n {
            let left = self.children_left[node];
            if left == LEAF_SENTINEL {
                return Ok(crate::model::normalize_counts(self.value.counts(node)?));
            }
            let f = usize::try_from(self.feature[node])
                .ok()
                .and_then(|f| x.get(f))
                .ok_or_else(|| RiskForestError::format(format!("node {} has an invalid feature", node)))?;
            let next = if *f <= self.threshold[node] {
                left
            } else {
                self.children_right[node]
            };
            node = usize::try_from(next)
                .ok()
                .filter(|&c| c < n)
                .ok_or_else(|| RiskForestError::format(format!("node {} has an invalid child", node)))?;
        }
        Err(RiskForestError::format("traversal did not reach a leaf"))
    }
}

/// A fitted forest classifier together with its preprocessing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedEnsemble {
    /// Feature names in training order
    pub features: Vec<String>,
    /// Class labels in model output order
    pub classes: Vec<RawValue>,
    pub scaler: StandardScaler,
    /// Column name → fitted category list, text or numeric
    #[serde(default)]
    pub encoders: BTreeMap<String, Vec<RawValue>>,
    pub estimators: Vec<TrainedTree>,
}

impl TrainedEnsemble {
    /// Read a trained-ensemble dump
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RiskForestError::NotFound(path.to_path_buf()),
            _ => RiskForestError::IoError(e),
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Class labels as strings (numeric labels use their shortest decimal form)
    pub fn class_labels(&self) -> Vec<String> {
        self.classes.iter().map(ToString::to_string).collect()
    }

    /// Evaluate the ensemble directly on an already scaled feature vector:
    /// the mean of every estimator's normalized leaf distribution.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        if self.estimators.is_empty() {
            return Err(RiskForestError::format("ensemble has no estimators"));
        }
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.estimators {
            tree.check_shape(self.classes.len())?;
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(x)?) {
                *acc += p;
            }
        }
        let n = self.estimators.len() as f64;
        for p in &mut proba {
            *p /= n;
        }
        Ok(proba)
    }
}
