//! Inference configuration

use crate::error::{RiskForestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environmental reading carried by a prediction request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    Rainfall,
    RiverLevel,
    SoilMoisture,
}

/// Force a categorical attribute to a given category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeOverride {
    pub attribute: String,
    pub value: String,
}

impl AttributeOverride {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// When `reading > threshold`, apply `overrides` in order.
///
/// An override only takes effect if its attribute is a model feature whose
/// encoder knows the override value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRule {
    pub reading: Reading,
    pub threshold: f64,
    pub overrides: Vec<AttributeOverride>,
}

impl HeuristicRule {
    /// Rainfall above 40 mm marks the trigger attributes as heavy rainfall
    pub fn heavy_rainfall() -> Self {
        Self {
            reading: Reading::Rainfall,
            threshold: 40.0,
            overrides: vec![
                AttributeOverride::new("Attribute 2", "Heavy Rainfall"),
                AttributeOverride::new("Attribute 3", "Heavy Rainfall"),
                AttributeOverride::new("Attribute 4", "Heavy Rainfall"),
            ],
        }
    }

    /// River level above 15 marks glacier melt and a river flood trigger
    pub fn glacier_melt() -> Self {
        Self {
            reading: Reading::RiverLevel,
            threshold: 15.0,
            overrides: vec![
                AttributeOverride::new("Attribute 2", "Glacier Melting"),
                AttributeOverride::new("Attribute 3", "Glacier Melting"),
                AttributeOverride::new("Attribute 4", "Glacier Melting"),
                AttributeOverride::new("Attribute 1", "River Flood"),
            ],
        }
    }
}

/// Feature names under which raw readings are passed to the model.
///
/// All unset by default; name a feature only when the artifact was trained on
/// the physical reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingFeatures {
    pub rainfall: Option<String>,
    pub river_level: Option<String>,
    pub soil_moisture: Option<String>,
}

impl ReadingFeatures {
    pub fn feature_for(&self, reading: Reading) -> Option<&str> {
        match reading {
            Reading::Rainfall => self.rainfall.as_deref(),
            Reading::RiverLevel => self.river_level.as_deref(),
            Reading::SoilMoisture => self.soil_moisture.as_deref(),
        }
    }
}

/// Configuration for feature building and prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Rules applied in order; later rules overwrite earlier ones
    pub heuristics: Vec<HeuristicRule>,

    /// Category used when a categorical hint is absent
    pub default_category: String,

    /// Attribute receiving the request's district hint
    pub district_attribute: String,

    /// Attribute receiving the request's trigger hint
    pub trigger_attribute: String,

    /// Categorical attributes initialised to `default_category`
    pub placeholder_attributes: Vec<String>,

    /// Where readings appear in the raw attribute map
    pub reading_features: ReadingFeatures,

    /// Batches at least this large are predicted in parallel
    pub parallel_threshold: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            heuristics: vec![HeuristicRule::heavy_rainfall(), HeuristicRule::glacier_melt()],
            default_category: "Unknown".to_string(),
            district_attribute: "District".to_string(),
            trigger_attribute: "Attribute 1".to_string(),
            placeholder_attributes: vec!["Attribute 1".to_string(), "Attribute 2".to_string()],
            reading_features: ReadingFeatures::default(),
            parallel_threshold: 64,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RiskForestError::NotFound(path.to_path_buf()),
            _ => RiskForestError::IoError(e),
        })?;
        serde_json::from_str(&text)
            .map_err(|e| RiskForestError::InvalidInput(format!("config {}: {}", path.display(), e)))
    }

    /// Builder method to replace the heuristic rules
    pub fn with_heuristics(mut self, rules: Vec<HeuristicRule>) -> Self {
        self.heuristics = rules;
        self
    }

    /// Builder method to disable all heuristic overrides
    pub fn without_heuristics(mut self) -> Self {
        self.heuristics.clear();
        self
    }

    /// Builder method to change the threshold of every rule triggered by `reading`
    pub fn with_threshold(mut self, reading: Reading, threshold: f64) -> Self {
        for rule in self.heuristics.iter_mut().filter(|r| r.reading == reading) {
            rule.threshold = threshold;
        }
        self
    }

    /// Builder method to set the default category literal
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Builder method to set the reading feature names
    pub fn with_reading_features(mut self, features: ReadingFeatures) -> Self {
        self.reading_features = features;
        self
    }

    /// Builder method to set the parallel batch threshold
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.heuristics.len(), 2);
        assert_eq!(config.heuristics[0].reading, Reading::Rainfall);
        assert_eq!(config.heuristics[0].threshold, 40.0);
        assert_eq!(config.heuristics[1].reading, Reading::RiverLevel);
        assert_eq!(config.heuristics[1].threshold, 15.0);
        assert_eq!(config.default_category, "Unknown");
        assert_eq!(config.reading_features, ReadingFeatures::default());
        assert_eq!(config.reading_features.feature_for(Reading::Rainfall), None);
    }

    #[test]
    fn test_builder_pattern() {
        let config = InferenceConfig::new()
            .with_threshold(Reading::Rainfall, 60.0)
            .with_default_category("N/A")
            .with_parallel_threshold(0);

        assert_eq!(config.heuristics[0].threshold, 60.0);
        assert_eq!(config.heuristics[1].threshold, 15.0);
        assert_eq!(config.default_category, "N/A");
        assert_eq!(config.parallel_threshold, 1);
        assert!(InferenceConfig::new().without_heuristics().heuristics.is_empty());
    }

    #[test]
    fn test_partial_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_category": "None", "reading_features": {"rainfall": "Attribute 5"}}"#)
            .unwrap();

        let config = InferenceConfig::from_path(&path).unwrap();
        assert_eq!(config.default_category, "None");
        assert_eq!(config.reading_features.feature_for(Reading::Rainfall), Some("Attribute 5"));
        assert_eq!(config.reading_features.feature_for(Reading::RiverLevel), None);
        assert_eq!(config.heuristics.len(), 2);
    }

    #[test]
    fn test_rules_serialize() {
        let json = serde_json::to_value(HeuristicRule::glacier_melt()).unwrap();
        assert_eq!(json["reading"], "river_level");
        assert_eq!(json["overrides"][3]["value"], "River Flood");
    }
}
