//! Crop Query Validation
//!
//! Turns a raw JSON request body into a validated `CropQuery`.
//! Checks run in a fixed order and the first violation wins:
//! numeric fields (N, P, K, temperature, humidity, ph, rainfall), then soil type.

use crate::classifier::FeatureVector;
use crate::soil::SoilType;
use serde_json::{Map, Value};

/// Numeric request fields, in validation and feature order
pub const NUMERIC_FIELDS: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

pub const SOIL_FIELD: &str = "soil_type";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: could not convert {value} to float")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid {field}: {value} is not a finite number")]
    NonFinite { field: &'static str, value: String },

    #[error("Soil type '{0}' not recognized")]
    UnknownSoil(String),
}

/// Validated crop prediction request
#[derive(Debug, Clone, PartialEq)]
pub struct CropQuery {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
    pub soil: SoilType,
}

impl CropQuery {
    /// Validate a request body
    pub fn from_json(body: &Value) -> Result<Self, QueryError> {
        let obj = body.as_object().ok_or(QueryError::NotAnObject)?;

        let mut numeric = [0.0_f64; 7];
        for (slot, field) in numeric.iter_mut().zip(NUMERIC_FIELDS) {
            *slot = numeric_field(obj, field)?;
        }

        let soil = match obj.get(SOIL_FIELD) {
            None | Some(Value::Null) => return Err(QueryError::MissingField(SOIL_FIELD)),
            Some(Value::String(label)) => {
                SoilType::from_label(label).ok_or_else(|| QueryError::UnknownSoil(label.clone()))?
            }
            Some(other) => return Err(QueryError::UnknownSoil(other.to_string())),
        };

        let [nitrogen, phosphorus, potassium, temperature, humidity, ph, rainfall] = numeric;
        Ok(Self {
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
            soil,
        })
    }

    /// Model input: `[N, P, K, temperature, humidity, ph, rainfall, soil_code]`
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector::new([
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
            f64::from(self.soil.code()),
        ])
    }
}

fn numeric_field(obj: &Map<String, Value>, field: &'static str) -> Result<f64, QueryError> {
    let raw = obj.get(field).ok_or(QueryError::MissingField(field))?;
    let value = coerce_f64(raw).ok_or_else(|| QueryError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;

    if !value.is_finite() {
        return Err(QueryError::NonFinite { field, value: raw.to_string() });
    }
    Ok(value)
}

/// Float coercion accepting numbers, numeric strings and booleans
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
