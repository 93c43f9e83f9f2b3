//! Binary decision tree codec
//!
//! On disk a tree is a set of parallel arrays indexed by node id (the layout
//! scikit-learn style exporters produce). In memory every node is a tagged
//! [`TreeNode`], and a [`Tree`] can only be built from arrays that satisfy the
//! structural invariants, so traversal needs no bounds or sentinel checks.

use crate::error::{RiskForestError, Result};
use serde::{Deserialize, Serialize};

/// Child index marking a leaf in the flat layout
pub const LEAF_SENTINEL: i64 = -1;

/// Tolerance used when deciding whether a leaf already sums to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Flat wire representation of one tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl TreeDocument {
    /// Node count, checking that all parallel arrays agree
    pub fn node_count(&self) -> Result<usize> {
        let n = self.left.len();
        let lengths = [
            ("right", self.right.len()),
            ("feature", self.feature.len()),
            ("threshold", self.threshold.len()),
            ("value", self.value.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(RiskForestError::format(format!(
                    "'left' has {} nodes but '{}' has {}",
                    n, name, len
                )));
            }
        }
        if n == 0 {
            return Err(RiskForestError::format("tree has no nodes"));
        }
        Ok(n)
    }
}

/// A validated tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node; `probs` sums to 1, or is all zeros when the leaf saw no samples
    Leaf { probs: Vec<f64> },
    /// `x[feature] <= threshold` descends left, otherwise right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }
}

/// Normalize a class-count vector into a probability vector.
///
/// A vector with zero total yields all zeros ("no vote").
pub fn normalize_counts(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        vec![0.0; counts.len()]
    }
}

/// Leaf vectors that already sum to one are kept bit-for-bit; anything else
/// (raw counts from older exports) is normalized by its own total.
fn canonical_leaf(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if (total - 1.0).abs() <= PROBABILITY_TOLERANCE {
        values.to_vec()
    } else {
        normalize_counts(values)
    }
}

/// A validated binary decision tree; node 0 is the root
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Validate a flat document and convert it into tagged nodes
    pub fn from_document(doc: &TreeDocument, n_features: usize, n_classes: usize) -> Result<Self> {
        let n = doc.node_count()?;
        let mut nodes = Vec::with_capacity(n);

        for i in 0..n {
            let (l, r) = (doc.left[i], doc.right[i]);
            let node = match (l == LEAF_SENTINEL, r == LEAF_SENTINEL) {
                (true, true) => {
                    let values = &doc.value[i];
                    if values.len() != n_classes {
                        return Err(RiskForestError::format(format!(
                            "leaf {} has {} class values, expected {}",
                            i,
                            values.len(),
                            n_classes
                        )));
                    }
                    if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
                        return Err(RiskForestError::format(format!(
                            "leaf {} has invalid class value {}",
                            i, v
                        )));
                    }
                    TreeNode::Leaf {
                        probs: canonical_leaf(values),
                    }
                }
                (false, false) => {
                    let left = child_index(l, i, n)?;
                    let right = child_index(r, i, n)?;
                    let feature = usize::try_from(doc.feature[i])
                        .ok()
                        .filter(|&f| f < n_features)
                        .ok_or_else(|| {
                            RiskForestError::format(format!(
                                "node {} splits on feature {} but the model has {} features",
                                i, doc.feature[i], n_features
                            ))
                        })?;
                    let threshold = doc.threshold[i];
                    if threshold.is_nan() {
                        return Err(RiskForestError::format(format!(
                            "node {} has a NaN threshold",
                            i
                        )));
                    }
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    }
                }
                _ => {
                    return Err(RiskForestError::format(format!(
                        "node {} is half a leaf (left = {}, right = {})",
                        i, l, r
                    )));
                }
            };
            nodes.push(node);
        }

        check_acyclic(&nodes)?;
        Ok(Self { nodes })
    }

    /// Flatten back into the wire layout; split nodes carry an all-zero value vector
    pub fn to_document(&self, n_classes: usize) -> TreeDocument {
        let n = self.nodes.len();
        let mut doc = TreeDocument {
            left: Vec::with_capacity(n),
            right: Vec::with_capacity(n),
            feature: Vec::with_capacity(n),
            threshold: Vec::with_capacity(n),
            value: Vec::with_capacity(n),
        };
        for node in &self.nodes {
            match node {
                TreeNode::Leaf { probs } => {
                    doc.left.push(LEAF_SENTINEL);
                    doc.right.push(LEAF_SENTINEL);
                    // sklearn marks leaves with feature -2 / threshold -2.0
                    doc.feature.push(-2);
                    doc.threshold.push(-2.0);
                    doc.value.push(probs.clone());
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    doc.left.push(*left as i64);
                    doc.right.push(*right as i64);
                    doc.feature.push(*feature as i64);
                    doc.threshold.push(*threshold);
                    doc.value.push(vec![0.0; n_classes]);
                }
            }
        }
        doc
    }

    /// Descend from the root and return the probability vector of the reached leaf.
    ///
    /// `x` must cover every feature index validated in [`Tree::from_document`];
    /// [`Forest::predict_proba`](super::Forest::predict_proba) checks the width.
    #[inline]
    pub(crate) fn leaf_probs(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { probs } => return probs,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf reachable from the root (a lone leaf has depth 0)
    pub fn max_depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                TreeNode::Leaf { .. } => max_depth = max_depth.max(depth),
                TreeNode::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        max_depth
    }
}

fn child_index(raw: i64, parent: usize, n: usize) -> Result<usize> {
    let idx = usize::try_from(raw)
        .ok()
        .filter(|&c| c < n)
        .ok_or_else(|| {
            RiskForestError::format(format!(
                "node {} has child index {} outside 0..{}",
                parent, raw, n
            ))
        })?;
    if idx == parent {
        return Err(RiskForestError::format(format!(
            "node {} lists itself as a child",
            parent
        )));
    }
    Ok(idx)
}

/// Every node reachable from the root must be reached exactly once
fn check_acyclic(nodes: &[TreeNode]) -> Result<()> {
    let mut visited = vec![false; nodes.len()];
    let mut stack = vec![0usize];
    while let Some(idx) = stack.pop() {
        if visited[idx] {
            return Err(RiskForestError::format(format!(
                "node {} is reached more than once (cycle or shared subtree)",
                idx
            )));
        }
        visited[idx] = true;
        if let TreeNode::Split { left, right, .. } = &nodes[idx] {
            stack.push(*left);
            stack.push(*right);
        }
    }
    Ok(())
}
