//! Risk assessment
//!
//! Maps a hazard prediction onto a risk tier, a display color and safety
//! recommendations, and provides a deterministic heuristic estimator for
//! when no model can serve.

use crate::inference::{PredictionRequest, PredictionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Hazard class meaning "no specific danger"
pub const NORMAL: &str = "Normal";

/// Risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    Critical,
}

impl RiskLevel {
    /// Tier for a model confidence in `[0, 1]`
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            RiskLevel::Critical
        } else if confidence > 0.4 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Tier for a heuristic risk factor
    pub fn from_risk_factor(factor: f64) -> Self {
        if factor > 0.8 {
            RiskLevel::Critical
        } else if factor > 0.4 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Display color as a hex literal
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "#ef4444",
            RiskLevel::Moderate => "#f97316",
            RiskLevel::Low => "#10b981",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Safety recommendations for a hazard class
pub fn recommendations(hazard: &str) -> Vec<String> {
    let recs: &[&str] = match hazard {
        "GLOF" => &["Move to high ground", "Avoid river valleys"],
        "Landslide" => &["Stay away from slopes", "Monitor road blocks"],
        "Flood" => &["Evacuate to elevated zones", "Secure electricals"],
        "Earthquake" => &["Drop, Cover, Hold on", "Stay outdoors in open"],
        NORMAL => &["No specific danger", "Stay informed"],
        _ => &["Stay alert."],
    };
    recs.iter().map(|s| s.to_string()).collect()
}

/// Where an assessment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Model,
    Fallback,
}

/// User-facing risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub hazard: String,
    pub level: RiskLevel,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    pub color: String,
    pub recommendations: Vec<String>,
    pub source: AssessmentSource,
}

impl RiskAssessment {
    pub fn from_prediction(prediction: &PredictionResult) -> Self {
        let level = RiskLevel::from_confidence(prediction.confidence);
        Self {
            hazard: prediction.class.clone(),
            level,
            confidence: prediction.confidence,
            color: level.color().to_string(),
            recommendations: recommendations(&prediction.class),
            source: AssessmentSource::Model,
        }
    }

    /// Confidence as a percentage rounded to one decimal
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 1000.0).round() / 10.0
    }
}

/// Deterministic heuristic used when the model is unavailable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEstimator {
    /// Risk factor above which a hazard is reported
    pub threshold: f64,
    /// Candidate hazards, picked by a stable hash of the longitude
    pub hazards: Vec<String>,
}

impl Default for FallbackEstimator {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            hazards: ["Landslide", "Flood", "GLOF", "Earthquake"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FallbackEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `rainfall/300 + river_level/30`, or a stable latitude hash in `[0, 1)` when both are zero
    pub fn risk_factor(&self, request: &PredictionRequest) -> f64 {
        let factor = request.rainfall.unwrap_or(0.0) / 300.0 + request.river_level.unwrap_or(0.0) / 30.0;
        if factor == 0.0 {
            (stable_hash(request.latitude) % 100) as f64 / 100.0
        } else {
            factor
        }
    }

    pub fn estimate(&self, request: &PredictionRequest) -> RiskAssessment {
        let factor = self.risk_factor(request);
        let hazard = if factor > self.threshold && !self.hazards.is_empty() {
            let idx = (stable_hash(request.longitude) % self.hazards.len() as u64) as usize;
            self.hazards[idx].clone()
        } else {
            NORMAL.to_string()
        };
        let level = RiskLevel::from_risk_factor(factor);
        let confidence = (70.0 + 20.0 * factor).min(95.0) / 100.0;

        RiskAssessment {
            recommendations: recommendations(&hazard),
            hazard,
            level,
            confidence,
            color: level.color().to_string(),
            source: AssessmentSource::Fallback,
        }
    }
}

fn stable_hash(value: f64) -> u64 {
    xxh3_64(value.to_string().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tiers() {
        assert_eq!(RiskLevel::from_confidence(0.95), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_confidence(0.7), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_confidence(0.41), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_confidence(0.4), RiskLevel::Low);
        assert_eq!(RiskLevel::Critical.color(), "#ef4444");
        assert_eq!(RiskLevel::Low.to_string(), "Low");
    }

    #[test]
    fn test_recommendations() {
        assert_eq!(recommendations("GLOF"), vec!["Move to high ground", "Avoid river valleys"]);
        assert_eq!(recommendations("Avalanche"), vec!["Stay alert."]);
    }

    #[test]
    fn test_assessment_from_prediction() {
        let prediction = PredictionResult {
            class: "Flood".into(),
            confidence: 0.8123,
            probabilities: vec![0.8123, 0.1877],
        };
        let assessment = RiskAssessment::from_prediction(&prediction);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert_eq!(assessment.color, "#ef4444");
        assert_eq!(assessment.source, AssessmentSource::Model);
        assert_eq!(assessment.confidence_percent(), 81.2);
    }

    #[test]
    fn test_fallback_uses_readings() {
        let estimator = FallbackEstimator::new();
        let request = PredictionRequest::new(35.9, 74.3)
            .with_rainfall(150.0)
            .with_river_level(15.0);

        assert!((estimator.risk_factor(&request) - 1.0).abs() < 1e-12);
        let assessment = estimator.estimate(&request);
        assert!(estimator.hazards.contains(&assessment.hazard));
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!((assessment.confidence - 0.9).abs() < 1e-12);
        assert_eq!(assessment.source, AssessmentSource::Fallback);
    }

    #[test]
    fn test_fallback_low_readings_are_normal() {
        let assessment = FallbackEstimator::new().estimate(&PredictionRequest::new(35.9, 74.3).with_rainfall(30.0));
        assert_eq!(assessment.hazard, NORMAL);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.recommendations, vec!["No specific danger", "Stay informed"]);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let estimator = FallbackEstimator::new();
        let request = PredictionRequest::new(36.3165, 76.4139);
        let a = estimator.estimate(&request);
        let b = estimator.estimate(&request);
        assert_eq!(a, b);
        let factor = estimator.risk_factor(&request);
        assert!((0.0..1.0).contains(&factor));
    }

    #[test]
    fn test_confidence_capped() {
        let assessment = FallbackEstimator::new().estimate(&PredictionRequest::new(0.0, 0.0).with_river_level(300.0));
        assert_eq!(assessment.confidence, 0.95);
    }
}
