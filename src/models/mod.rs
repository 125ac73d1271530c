//! ML model loading and inference components

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use classifier::{Classifier, ClassifierOutput, Probabilities};
pub use inference::OnnxClassifier;
pub use loader::{discover, ArtifactPair, ArtifactSet, ModelLoader};
pub use scaler::Scaler;

use serde::Serialize;
use std::fmt;

/// The three sub-models served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubModel {
    /// DSO1: benign vs malignant
    Diagnosis,
    /// DSO2: tumour stage
    Stage,
    /// DSO3: recurrence risk
    Risk,
}

impl SubModel {
    pub const ALL: [SubModel; 3] = [SubModel::Diagnosis, SubModel::Stage, SubModel::Risk];

    /// Short tag used in messages
    pub fn tag(&self) -> &'static str {
        match self {
            SubModel::Diagnosis => "DSO1",
            SubModel::Stage => "DSO2",
            SubModel::Risk => "DSO3",
        }
    }

    /// Name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            SubModel::Diagnosis => "diagnosis",
            SubModel::Stage => "stage",
            SubModel::Risk => "risk",
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            SubModel::Diagnosis => "/predict",
            SubModel::Stage => "/predict_stage",
            SubModel::Risk => "/predict_risk",
        }
    }
}

impl fmt::Display for SubModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
