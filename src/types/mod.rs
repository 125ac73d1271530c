//! Type definitions for the prediction service

pub mod outcome;
pub mod request;
pub mod response;

pub use outcome::{Diagnosis, RiskLevel};
pub use request::FeatureRequest;
pub use response::{
    Banner, DiagnosisResponse, ErrorResponse, Reply, RiskResponse, StageResponse,
};
