//! Label mapping for model outputs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Probabilities strictly above this value select the positive label
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Stage class that is always reported, even when the model was not fitted on it
pub const BENIGN_STAGE_CODE: i64 = 0;

/// DSO1 diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    Benign,
    Malignant,
}

impl Diagnosis {
    /// `p == 0.5` is benign
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            Diagnosis::Malignant
        } else {
            Diagnosis::Benign
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Benign => "Benign",
            Diagnosis::Malignant => "Malignant",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DSO3 recurrence risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    /// Determine risk level from the recurrence probability
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human label for a stage class code
pub fn stage_label(code: i64) -> String {
    match code {
        0 => "Benign (0)".to_string(),
        1 => "Stage I".to_string(),
        2 => "Stage II".to_string(),
        3 => "Stage III".to_string(),
        4 => "Stage IV".to_string(),
        other => format!("Classe {other}"),
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_threshold_is_strict() {
        assert_eq!(Diagnosis::from_probability(0.5), Diagnosis::Benign);
        assert_eq!(Diagnosis::from_probability(0.500_001), Diagnosis::Malignant);
        assert_eq!(Diagnosis::from_probability(0.0), Diagnosis::Benign);
        assert_eq!(Diagnosis::from_probability(1.0), Diagnosis::Malignant);
    }

    #[test]
    fn test_risk_level_from_probability() {
        assert_eq!(RiskLevel::from_probability(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.75), RiskLevel::High);
        assert_eq!(RiskLevel::High.to_string(), "High");
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(stage_label(0), "Benign (0)");
        assert_eq!(stage_label(3), "Stage III");
        assert_eq!(stage_label(4), "Stage IV");
        assert_eq!(stage_label(7), "Classe 7");
        assert_eq!(stage_label(-1), "Classe -1");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123_456, 4), 0.1235);
        assert_eq!(round_to(87.654_321, 2), 87.65);
        assert_eq!(round_to(1.0, 4), 1.0);
    }
}
