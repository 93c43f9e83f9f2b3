//! Standard scaling codec: `(x - mean) / scale` per feature

use crate::error::{RiskForestError, Result};
use serde::{Deserialize, Serialize};

/// Fitted standardization parameters, one `(mean, scale)` pair per feature.
///
/// A `StandardScaler` obtained through [`StandardScaler::new`] or through
/// artifact loading is guaranteed to have matching lengths and only finite,
/// non-zero scales, so [`StandardScaler::scale`] never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Build a validated scaler for `n_features` features
    pub fn new(mean: Vec<f64>, scale: Vec<f64>, n_features: usize) -> Result<Self> {
        let scaler = Self { mean, scale };
        scaler.validate(n_features)?;
        Ok(scaler)
    }

    /// Check lengths against the feature count and reject unusable scales
    pub fn validate(&self, n_features: usize) -> Result<()> {
        if self.mean.len() != n_features {
            return Err(RiskForestError::format(format!(
                "scaler mean has {} entries, expected {}",
                self.mean.len(),
                n_features
            )));
        }
        if self.scale.len() != n_features {
            return Err(RiskForestError::format(format!(
                "scaler scale has {} entries, expected {}",
                self.scale.len(),
                n_features
            )));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(RiskForestError::format(format!(
                "scaler mean[{}] is not finite ({})",
                i, self.mean[i]
            )));
        }
        if let Some(i) = self.scale.iter().position(|&s| s == 0.0 || !s.is_finite()) {
            return Err(RiskForestError::format(format!(
                "scaler scale[{}] must be finite and non-zero, got {}",
                i, self.scale[i]
            )));
        }
        Ok(())
    }

    /// Standardize one value of feature `feature_idx`
    #[inline]
    pub fn scale(&self, feature_idx: usize, value: f64) -> f64 {
        (value - self.mean[feature_idx]) / self.scale[feature_idx]
    }

    /// Number of features this scaler covers
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Per-feature centers
    pub fn means(&self) -> &[f64] {
        &self.mean
    }

    /// Per-feature scale factors
    pub fn scales(&self) -> &[f64] {
        &self.scale
    }
}
