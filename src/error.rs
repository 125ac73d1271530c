//! Request-level error taxonomy

use crate::models::SubModel;
use axum::http::StatusCode;
use thiserror::Error;

/// Why a prediction request did not produce a prediction
#[derive(Debug, Error)]
pub enum PredictError {
    /// The feature vector has the wrong length; the model was not invoked
    #[error("{model} expects {expected} features, received {received}")]
    FeatureCount {
        model: SubModel,
        expected: usize,
        received: usize,
    },

    /// The sub-model's artifacts were not found at startup
    #[error("{model} unavailable: train and save {model_file} + {scaler_file}")]
    Unavailable {
        model: SubModel,
        model_file: String,
        scaler_file: String,
    },

    /// The runtime failed or produced an output we cannot interpret
    #[error("{model} inference failed: {source:#}")]
    Inference {
        model: SubModel,
        #[source]
        source: anyhow::Error,
    },
}

impl PredictError {
    pub fn inference(model: SubModel, source: anyhow::Error) -> Self {
        PredictError::Inference { model, source }
    }

    /// HTTP status for this error.
    ///
    /// Validation and availability errors are reported with 200 unless
    /// `strict` is set; inference failures are always 500.
    pub fn status_code(&self, strict: bool) -> StatusCode {
        match self {
            PredictError::FeatureCount { .. } if strict => StatusCode::BAD_REQUEST,
            PredictError::Unavailable { .. } if strict => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::FeatureCount { .. } | PredictError::Unavailable { .. } => StatusCode::OK,
            PredictError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
