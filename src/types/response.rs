//! Response bodies of the HTTP surface

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    /// Probability of malignancy, rounded to 4 decimals
    pub probability_malignant: f64,
    /// "Malignant" or "Benign"
    pub diagnosis: String,
}

/// `POST /predict_stage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResponse {
    pub predicted_stage: String,
    pub stage_code: i64,
    /// Stage label -> probability
    pub probabilities: HashMap<String, f64>,
}

/// `POST /predict_risk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResponse {
    /// Recurrence probability as a percentage, rounded to 2 decimals
    pub future_risk_probability_percent: f64,
    /// "High" or "Low"
    pub risk_level: String,
    /// Unrounded recurrence probability
    pub probability_recurrence: f64,
}

/// Structured error returned in place of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Either a prediction or a structured error, serialized without a wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Ok(T),
    Err(ErrorResponse),
}

impl<T> Reply<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Reply::Ok(body) => Some(body),
            Reply::Err(_) => None,
        }
    }

    pub fn err(self) -> Option<ErrorResponse> {
        match self {
            Reply::Ok(_) => None,
            Reply::Err(e) => Some(e),
        }
    }
}

/// `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
    pub title: String,
    pub version: String,
    /// Route -> description, or the unavailability notice
    pub endpoints: BTreeMap<String, String>,
}
