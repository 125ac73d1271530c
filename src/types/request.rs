//! Prediction request payloads and documented sample vectors

use serde::{Deserialize, Serialize};

/// Feature count of the WDBC layout consumed by DSO1 and DSO2
pub const WDBC_FEATURES: usize = 30;

/// Feature count of the WPBC layout consumed by DSO3
pub const WPBC_FEATURES: usize = 33;

/// Documented WDBC example (first record of the dataset, malignant)
pub const WDBC_SAMPLE: [f64; WDBC_FEATURES] = [
    17.99, 10.38, 122.8, 1001.0, 0.1184, 0.2776, 0.3001, 0.1471, 0.2419, 0.07871, 1.095, 0.9053,
    8.589, 153.4, 0.006399, 0.04904, 0.05373, 0.01587, 0.03003, 0.006193, 25.38, 17.33, 184.6,
    2019.0, 0.1622, 0.6656, 0.7119, 0.2654, 0.4601, 0.1189,
];

/// Documented WPBC example: time, 30 cell nucleus features, tumour size, lymph node status
pub const WPBC_SAMPLE: [f64; WPBC_FEATURES] = [
    27.0, 20.29, 14.34, 135.10, 1297.0, 0.10030, 0.13280, 0.19800, 0.10430, 0.1809, 0.05883,
    0.7572, 0.7813, 5.438, 94.44, 0.011490, 0.02461, 0.05688, 0.01885, 0.01756, 0.005115, 22.54,
    16.67, 152.20, 1575.0, 0.1374, 0.2050, 0.4000, 0.1625, 0.2364, 0.07678, 3.5, 0.0,
];

/// Body of every `POST /predict*` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRequest {
    /// Raw, unscaled features in training order
    pub features: Vec<f64>,
}

impl FeatureRequest {
    pub fn new(features: impl Into<Vec<f64>>) -> Self {
        Self {
            features: features.into(),
        }
    }

    /// The documented diagnosis/stage example payload
    pub fn wdbc_sample() -> Self {
        Self::new(WDBC_SAMPLE)
    }

    /// The documented recurrence-risk example payload
    pub fn wpbc_sample() -> Self {
        Self::new(WPBC_SAMPLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_integers_as_floats() {
        let req: FeatureRequest = serde_json::from_str(r#"{"features": [27, 20.29, 0]}"#).unwrap();
        assert_eq!(req.features, vec![27.0, 20.29, 0.0]);
    }

    #[test]
    fn test_missing_features_is_rejected() {
        assert!(serde_json::from_str::<FeatureRequest>(r#"{"values": [1.0]}"#).is_err());
    }

    #[test]
    fn test_samples_have_documented_lengths() {
        assert_eq!(FeatureRequest::wdbc_sample().features.len(), 30);
        assert_eq!(FeatureRequest::wpbc_sample().features.len(), 33);
        assert_eq!(WDBC_SAMPLE[0], 17.99);
        assert_eq!(WPBC_SAMPLE[32], 0.0);
    }
}
