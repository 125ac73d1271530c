//! Ena Healthy prediction service
//!
//! Serves three pretrained breast cancer models over HTTP: a benign vs
//! malignant diagnosis classifier (DSO1), a tumour stage classifier
//! (DSO2) and an optional recurrence-risk classifier (DSO3). Each request
//! is validated, scaled with the model's fitted scaler and run through
//! ONNX Runtime.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::PredictError;
pub use models::{ModelLoader, SubModel};
pub use service::PredictionService;
pub use types::FeatureRequest;
