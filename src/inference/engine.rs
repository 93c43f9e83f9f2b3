//! Inference engine implementation
//!
//! - `ModelHandle`: an `Arc`-shared, immutable, validated artifact
//! - `InferenceEngine`: hot-swappable current handle plus prediction counters
//! - Parallel batch prediction via rayon

use super::features::{FeatureVectorBuilder, PredictionRequest};
use super::InferenceConfig;
use crate::error::{RiskForestError, Result};
use crate::model::{argmax, ModelArtifact};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Winning class label
    pub class: String,
    /// Normalized probability of the winning class, in `[0, 1]`
    pub confidence: f64,
    /// Full normalized distribution, in artifact class order
    pub probabilities: Vec<f64>,
}

/// Shared reference to a loaded artifact
#[derive(Debug, Clone)]
pub struct ModelHandle(Arc<ModelArtifact>);

impl ModelHandle {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self(Arc::new(artifact))
    }

    /// Load and fully validate an artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ModelArtifact::from_path(path)?))
    }

    /// Predict one request against this artifact
    pub fn predict(&self, config: &InferenceConfig, request: &PredictionRequest) -> Result<PredictionResult> {
        let vector = FeatureVectorBuilder::new(&self.0, config).build(request)?;
        let probabilities = self.0.forest().predict_proba(&vector)?;
        let idx = argmax(&probabilities).ok_or(RiskForestError::PredictionUndefined)?;

        let class = self.0.classes()[idx].clone();
        let confidence = probabilities[idx];
        debug!(class = %class, confidence, "prediction");

        Ok(PredictionResult {
            class,
            confidence,
            probabilities,
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.0
    }

    /// Whether two handles point at the same loaded artifact
    pub fn ptr_eq(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for ModelHandle {
    type Target = ModelArtifact;

    fn deref(&self) -> &ModelArtifact {
        &self.0
    }
}

impl From<ModelArtifact> for ModelHandle {
    fn from(artifact: ModelArtifact) -> Self {
        Self::new(artifact)
    }
}

/// Inference statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub total_predictions: u64,
    pub successful: u64,
    pub unavailable: u64,
    pub undefined: u64,
    pub invalid_input: u64,
    pub reloads: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    successful: AtomicU64,
    unavailable: AtomicU64,
    undefined: AtomicU64,
    invalid_input: AtomicU64,
    reloads: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &Result<PredictionResult>) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Ok(_) => &self.successful,
            Err(RiskForestError::ModelUnavailable) => &self.unavailable,
            Err(RiskForestError::PredictionUndefined) => &self.undefined,
            Err(_) => &self.invalid_input,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> InferenceStats {
        InferenceStats {
            total_predictions: self.total.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            undefined: self.undefined.load(Ordering::Relaxed),
            invalid_input: self.invalid_input.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

/// Current model and the file it came from, swapped together
#[derive(Debug, Default)]
struct ModelSlot {
    handle: Option<ModelHandle>,
    source: Option<PathBuf>,
}

/// Serves predictions from the currently installed model
pub struct InferenceEngine {
    config: InferenceConfig,
    slot: RwLock<ModelSlot>,
    counters: Counters,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("config", &self.config)
            .field("is_loaded", &self.is_loaded())
            .field("source", &self.slot.read().source)
            .finish()
    }
}

impl InferenceEngine {
    /// Create an engine with no model installed
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(ModelSlot::default()),
            counters: Counters::default(),
        }
    }

    /// Install an in-memory artifact
    pub fn with_model(self, model: impl Into<ModelHandle>) -> Self {
        self.install(model.into());
        self
    }

    /// Load an artifact file and make it the current model.
    ///
    /// The file is validated before anything is published; on error the
    /// previously installed model (if any) keeps serving.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ModelHandle> {
        let path = path.as_ref();
        let handle = ModelHandle::load(path)?;
        *self.slot.write() = ModelSlot {
            handle: Some(handle.clone()),
            source: Some(path.to_path_buf()),
        };
        Ok(handle)
    }

    /// Re-read the file the current model was loaded from.
    ///
    /// If another `load` or `install` lands while the file is being read,
    /// the newer model stays and is returned.
    pub fn reload(&self) -> Result<ModelHandle> {
        let path = self
            .slot
            .read()
            .source
            .clone()
            .ok_or(RiskForestError::ModelUnavailable)?;
        let handle = match ModelHandle::load(&path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "reload failed; keeping current model");
                return Err(e);
            }
        };

        let mut slot = self.slot.write();
        if slot.source.as_deref() != Some(path.as_path()) {
            debug!(path = %path.display(), "model replaced during reload; discarding reloaded copy");
            return slot.handle.clone().ok_or(RiskForestError::ModelUnavailable);
        }
        slot.handle = Some(handle.clone());
        drop(slot);

        self.counters.reloads.fetch_add(1, Ordering::Relaxed);
        info!(path = %path.display(), "model reloaded");
        Ok(handle)
    }

    /// Swap in an in-memory model; in-flight predictions finish on the old one.
    ///
    /// The model has no backing file, so a later `reload` reports
    /// [`RiskForestError::ModelUnavailable`] until the next `load`.
    pub fn install(&self, handle: ModelHandle) {
        *self.slot.write() = ModelSlot {
            handle: Some(handle),
            source: None,
        };
    }

    /// Current model, if any
    pub fn handle(&self) -> Option<ModelHandle> {
        self.slot.read().handle.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().handle.is_some()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Predict one request with the current model
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let outcome = match self.handle() {
            Some(handle) => handle.predict(&self.config, request),
            None => Err(RiskForestError::ModelUnavailable),
        };
        self.counters.record(&outcome);
        outcome
    }

    /// Predict many requests against one model snapshot, preserving order
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Vec<Result<PredictionResult>> {
        let Some(handle) = self.handle() else {
            return requests
                .iter()
                .map(|_| {
                    let outcome = Err(RiskForestError::ModelUnavailable);
                    self.counters.record(&outcome);
                    outcome
                })
                .collect();
        };

        let predict_one = |request: &PredictionRequest| {
            let outcome = handle.predict(&self.config, request);
            self.counters.record(&outcome);
            outcome
        };

        if requests.len() >= self.config.parallel_threshold {
            requests.par_iter().map(predict_one).collect()
        } else {
            requests.iter().map(predict_one).collect()
        }
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        self.counters.snapshot()
    }
}
