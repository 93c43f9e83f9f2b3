//! Categorical label encoding with a deterministic unknown-value fallback

use crate::error::{RiskForestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A raw attribute value before encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Interpret the value as a number; text must parse as a float
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(*v),
            RawValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// String under which the value is looked up in a category list.
    ///
    /// Numbers keep a fractional part even when integral (`36.0`, not `36`),
    /// matching how numeric categories are written by the exporter.
    pub fn category_key(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Number(v) if v.is_nan() => "nan".to_string(),
            RawValue::Number(v) if v.is_infinite() => {
                if *v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
            }
            RawValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e16 => format!("{:.1}", v),
            RawValue::Number(v) => v.to_string(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(v) => write!(f, "{}", v),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

/// Ordered category list for one column; a category's position is its code.
///
/// On the wire this is just the list of category strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelEncoder {
    classes: Vec<String>,
    // first occurrence wins for duplicated categories
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Create an encoder from the fitted class list
    pub fn new(classes: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            index.entry(class.clone()).or_insert(i);
        }
        Self { classes, index }
    }

    /// Code of `value`, or 0 (the first class) when the value was never seen
    #[inline]
    pub fn encode(&self, value: &str) -> usize {
        self.index.get(value).copied().unwrap_or(0)
    }

    /// Whether `value` is one of the fitted categories
    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl PartialEq for LabelEncoder {
    fn eq(&self, other: &Self) -> bool {
        self.classes == other.classes
    }
}

impl From<Vec<String>> for LabelEncoder {
    fn from(classes: Vec<String>) -> Self {
        Self::new(classes)
    }
}

impl From<LabelEncoder> for Vec<String> {
    fn from(encoder: LabelEncoder) -> Self {
        encoder.classes
    }
}

/// Per-feature encoders; features without an entry are numeric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryEncoders {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl CategoryEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the class list for `feature`
    pub fn insert(&mut self, feature: impl Into<String>, classes: Vec<String>) {
        self.encoders.insert(feature.into(), LabelEncoder::new(classes));
    }

    pub fn get(&self, feature: &str) -> Option<&LabelEncoder> {
        self.encoders.get(feature)
    }

    pub fn is_categorical(&self, feature: &str) -> bool {
        self.encoders.contains_key(feature)
    }

    /// Whether `feature` is categorical and knows `value`
    pub fn accepts(&self, feature: &str, value: &str) -> bool {
        self.encoders.get(feature).is_some_and(|enc| enc.contains(value))
    }

    /// Turn a raw value into the number the model was trained on.
    ///
    /// Categorical features map to their category code (unknown → 0);
    /// numeric features take the value itself, and text that is not a
    /// number is rejected as a caller error.
    pub fn encode(&self, feature: &str, value: &RawValue) -> Result<f64> {
        match self.encoders.get(feature) {
            Some(encoder) => {
                let code = match value {
                    RawValue::Text(s) => encoder.encode(s),
                    RawValue::Number(_) => encoder.encode(&value.category_key()),
                };
                Ok(code as f64)
            }
            None => value.as_number().ok_or_else(|| {
                RiskForestError::InvalidInput(format!(
                    "feature '{}' is numeric but received '{}'",
                    feature, value
                ))
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LabelEncoder)> {
        self.encoders.iter()
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for CategoryEncoders {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            encoders: iter
                .into_iter()
                .map(|(name, classes)| (name, LabelEncoder::new(classes)))
                .collect(),
        }
    }
}
