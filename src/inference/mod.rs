//! Inference module
//!
//! Turns loosely specified prediction requests into model-ordered feature
//! vectors and evaluates them against a shared, immutable artifact:
//! - Category defaults and reading-driven heuristic overrides
//! - Label encoding and standard scaling per feature
//! - Hot-swappable model handle with prediction counters
//! - Parallel batch prediction via rayon

mod config;
mod engine;
mod features;

pub use config::{AttributeOverride, HeuristicRule, InferenceConfig, Reading, ReadingFeatures};
pub use engine::{InferenceEngine, InferenceStats, ModelHandle, PredictionResult};
pub use features::{FeatureVectorBuilder, PredictionRequest};
