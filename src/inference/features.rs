//! Feature vector building: request → raw attributes → encoded, scaled vector

use super::config::{InferenceConfig, Reading};
use crate::error::Result;
use crate::model::ModelArtifact;
use crate::preprocessing::RawValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One prediction request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default)]
    pub river_level: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    /// District name hint
    #[serde(default)]
    pub district: Option<String>,
    /// Primary trigger hint (e.g. "Cloudburst")
    #[serde(default)]
    pub trigger: Option<String>,
}

impl PredictionRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_rainfall(mut self, mm: f64) -> Self {
        self.rainfall = Some(mm);
        self
    }

    pub fn with_river_level(mut self, level: f64) -> Self {
        self.river_level = Some(level);
        self
    }

    pub fn with_soil_moisture(mut self, moisture: f64) -> Self {
        self.soil_moisture = Some(moisture);
        self
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn reading(&self, reading: Reading) -> Option<f64> {
        match reading {
            Reading::Rainfall => self.rainfall,
            Reading::RiverLevel => self.river_level,
            Reading::SoilMoisture => self.soil_moisture,
        }
    }
}

/// Builds model-ordered, encoded and scaled feature vectors for one artifact
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder<'a> {
    artifact: &'a ModelArtifact,
    config: &'a InferenceConfig,
}

impl<'a> FeatureVectorBuilder<'a> {
    pub fn new(artifact: &'a ModelArtifact, config: &'a InferenceConfig) -> Self {
        Self { artifact, config }
    }

    /// Raw attribute map after defaults and heuristic overrides
    pub fn raw_attributes(&self, request: &PredictionRequest) -> HashMap<String, RawValue> {
        let config = self.config;
        let mut data: HashMap<String, RawValue> = HashMap::new();

        data.insert("Latitude".to_string(), RawValue::Number(request.latitude));
        data.insert("Longitude".to_string(), RawValue::Number(request.longitude));
        data.insert(
            config.district_attribute.clone(),
            RawValue::Text(
                request
                    .district
                    .clone()
                    .unwrap_or_else(|| config.default_category.clone()),
            ),
        );
        for attr in &config.placeholder_attributes {
            data.insert(attr.clone(), RawValue::Text(config.default_category.clone()));
        }
        if let Some(trigger) = &request.trigger {
            data.insert(config.trigger_attribute.clone(), RawValue::Text(trigger.clone()));
        }

        for reading in [Reading::Rainfall, Reading::RiverLevel, Reading::SoilMoisture] {
            if let (Some(name), Some(value)) =
                (config.reading_features.feature_for(reading), request.reading(reading))
            {
                data.insert(name.to_string(), RawValue::Number(value));
            }
        }

        for rule in &config.heuristics {
            let observed = request.reading(rule.reading).unwrap_or(0.0);
            if observed > rule.threshold {
                for o in &rule.overrides {
                    if self.is_feature(&o.attribute)
                        && self.artifact.encoders().accepts(&o.attribute, &o.value)
                    {
                        data.insert(o.attribute.clone(), RawValue::Text(o.value.clone()));
                    }
                }
            }
        }

        data
    }

    /// Ordered vector of length F, one scaled value per model feature
    pub fn build(&self, request: &PredictionRequest) -> Result<Vec<f64>> {
        let data = self.raw_attributes(request);
        let encoders = self.artifact.encoders();
        let scaler = self.artifact.scaler();
        let missing = RawValue::Number(0.0);

        self.artifact
            .features()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let raw = data.get(name).unwrap_or(&missing);
                let encoded = encoders.encode(name, raw)?;
                Ok(scaler.scale(i, encoded))
            })
            .collect()
    }

    fn is_feature(&self, name: &str) -> bool {
        self.artifact.features().iter().any(|f| f == name)
    }
}
