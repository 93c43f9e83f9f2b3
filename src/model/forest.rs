//! Forest vote averaging

use super::tree::Tree;
use crate::error::{RiskForestError, Result};
use ndarray::{Array2, Zip};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

/// An ensemble of validated trees sharing one feature space and class list
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl Forest {
    pub fn new(trees: Vec<Tree>, n_features: usize, n_classes: usize) -> Result<Self> {
        if trees.is_empty() {
            return Err(RiskForestError::format("forest has no trees"));
        }
        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    /// Sum of the leaf distributions reached in every tree
    fn votes(&self, x: &[f64]) -> Vec<f64> {
        let mut votes = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in votes.iter_mut().zip(tree.leaf_probs(x)) {
                *acc += p;
            }
        }
        votes
    }

    /// Class distribution for one scaled feature vector.
    ///
    /// The summed votes are renormalized by their own total, so trees whose
    /// leaf saw no training samples simply do not count. If no tree votes at
    /// all the result is [`RiskForestError::PredictionUndefined`].
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.n_features {
            return Err(RiskForestError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        let mut votes = self.votes(x);
        let total: f64 = votes.iter().sum();
        if total <= 0.0 {
            return Err(RiskForestError::PredictionUndefined);
        }
        for v in &mut votes {
            *v /= total;
        }
        Ok(votes)
    }

    /// Class distributions for a matrix of scaled feature vectors (one row per sample).
    ///
    /// Rows run in parallel. If any row receives no votes at all the whole
    /// call fails with [`RiskForestError::PredictionUndefined`].
    pub fn predict_proba_batch(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(RiskForestError::InvalidInput(format!(
                "expected {} features per row, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        let undefined = AtomicBool::new(false);
        let mut out = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        Zip::from(out.rows_mut())
            .and(x.rows())
            .par_for_each(|mut out_row, x_row| {
                let row: Cow<[f64]> = match x_row.as_slice() {
                    Some(s) => Cow::Borrowed(s),
                    None => Cow::Owned(x_row.to_vec()),
                };
                match self.predict_proba(&row) {
                    Ok(probs) => {
                        for (o, p) in out_row.iter_mut().zip(probs) {
                            *o = p;
                        }
                    }
                    Err(_) => undefined.store(true, Ordering::Relaxed),
                }
            });

        if undefined.into_inner() {
            return Err(RiskForestError::PredictionUndefined);
        }
        Ok(out)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
