//! Error types for the risk-forest engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for risk-forest operations
pub type Result<T> = std::result::Result<T, RiskForestError>;

/// Main error type for export, load and prediction
#[derive(Error, Debug)]
pub enum RiskForestError {
    /// Artifact or trained-model file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A structural invariant of the artifact or trained ensemble is violated
    #[error("Format error: {0}")]
    FormatError(String),

    /// `predict` was called before a model was successfully loaded
    #[error("Model unavailable: no artifact has been loaded")]
    ModelUnavailable,

    /// Every tree voted with an all-zero leaf, so no class can be chosen
    #[error("Prediction undefined: the forest produced no votes")]
    PredictionUndefined,

    /// Caller-supplied value cannot be used (e.g. non-numeric text for a numeric feature)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RiskForestError {
    /// Shorthand for building a [`RiskForestError::FormatError`]
    pub fn format(msg: impl Into<String>) -> Self {
        RiskForestError::FormatError(msg.into())
    }

    /// Whether a caller may recover by falling back to a heuristic estimator
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RiskForestError::NotFound(_)
                | RiskForestError::ModelUnavailable
                | RiskForestError::PredictionUndefined
        )
    }
}

impl From<serde_json::Error> for RiskForestError {
    fn from(err: serde_json::Error) -> Self {
        // Syntax and schema problems in an artifact are format violations;
        // only genuine I/O failures keep their own category.
        if err.is_io() {
            RiskForestError::SerializationError(err.to_string())
        } else {
            RiskForestError::FormatError(err.to_string())
        }
    }
}

impl From<tempfile::PersistError> for RiskForestError {
    fn from(err: tempfile::PersistError) -> Self {
        RiskForestError::IoError(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RiskForestError::format("tree 0: left has 3 nodes, right has 2");
        assert_eq!(err.to_string(), "Format error: tree 0: left has 3 nodes, right has 2");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: RiskForestError = io_err.into();
        assert!(matches!(err, RiskForestError::IoError(_)));
    }

    #[test]
    fn test_bad_json_is_format_error() {
        let err: RiskForestError = serde_json::from_str::<Vec<f64>>("[1.0, oops]")
            .unwrap_err()
            .into();
        assert!(matches!(err, RiskForestError::FormatError(_)));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(RiskForestError::ModelUnavailable.is_recoverable());
        assert!(RiskForestError::PredictionUndefined.is_recoverable());
        assert!(RiskForestError::NotFound(PathBuf::from("model.json")).is_recoverable());
        assert!(!RiskForestError::format("zero scale").is_recoverable());
    }
}
