//! risk-forest - Random-forest hazard model export and inference
//!
//! This crate turns a trained random-forest classifier into a portable,
//! self-describing JSON artifact and reproduces the classifier's predictions
//! from that artifact alone:
//! - Artifact export with per-leaf probability normalization
//! - Eager artifact validation on load
//! - Feature vector building with category fallback and reading heuristics
//! - Shared, hot-swappable model handles and parallel batch prediction
//!
//! # Modules
//!
//! - [`preprocessing`] - Label encoding and standard scaling codecs
//! - [`model`] - Artifact schema, tree and forest evaluation
//! - [`export`] - Trained ensemble → artifact conversion
//! - [`inference`] - Request → feature vector → prediction
//! - [`assessment`] - Risk tiers, recommendations, heuristic fallback
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Codecs and model
pub mod preprocessing;
pub mod model;

// Export and inference
pub mod export;
pub mod inference;
pub mod assessment;

// Services
pub mod cli;

pub use error::{Result, RiskForestError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, RiskForestError};

    // Codecs
    pub use crate::preprocessing::{CategoryEncoders, LabelEncoder, RawValue, StandardScaler};

    // Model
    pub use crate::model::{ArtifactDocument, ArtifactSummary, Forest, ModelArtifact, Tree, TreeNode};

    // Export
    pub use crate::export::{ForestExporter, TrainedEnsemble, TrainedTree};

    // Inference
    pub use crate::inference::{
        FeatureVectorBuilder, HeuristicRule, InferenceConfig, InferenceEngine, InferenceStats, ModelHandle,
        PredictionRequest, PredictionResult,
    };

    // Assessment
    pub use crate::assessment::{FallbackEstimator, RiskAssessment, RiskLevel};
}
