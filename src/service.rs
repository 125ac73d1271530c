//! Prediction service: shape validation, scaling and output-label mapping
//!
//! A [`PredictionService`] is built once at startup and never mutated.
//! It owns one scaler/model pair per sub-model; the recurrence-risk pair
//! is optional and its absence turns every risk request into a fixed
//! error.

use crate::config::ArtifactConfig;
use crate::error::PredictError;
use crate::models::classifier::{argmax, Classifier};
use crate::models::{Scaler, SubModel};
use crate::types::outcome::{round_to, stage_label, BENIGN_STAGE_CODE};
use crate::types::request::WDBC_FEATURES;
use crate::types::{Banner, Diagnosis, DiagnosisResponse, RiskLevel, RiskResponse, StageResponse};
use anyhow::{ensure, Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A fitted scaler and the model it feeds
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Classifier>,
    scaler: Scaler,
}

impl Predictor {
    pub fn new(model: Arc<dyn Classifier>, scaler: Scaler) -> Self {
        Self { model, scaler }
    }

    /// Feature count fixed when the scaler was loaded
    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// Reject a wrong-length vector, otherwise scale it
    fn prepare(
        &self,
        sub: SubModel,
        features: &[f64],
        expected: usize,
    ) -> Result<Vec<f32>, PredictError> {
        if features.len() != expected {
            return Err(PredictError::FeatureCount {
                model: sub,
                expected,
                received: features.len(),
            });
        }
        Ok(self.scaler.transform(features))
    }

    fn infer(
        &self,
        sub: SubModel,
        scaled: &[f32],
    ) -> Result<crate::models::ClassifierOutput, PredictError> {
        self.model
            .infer(scaled)
            .map_err(|e| PredictError::inference(sub, e))
    }
}

/// DSO3 slot: loaded, or the artifact names to report when it is not
#[derive(Clone)]
enum RiskSlot {
    Available(Predictor),
    Unavailable(ArtifactConfig),
}

/// Immutable set of loaded sub-models
#[derive(Clone)]
pub struct PredictionService {
    diagnosis: Predictor,
    stage: Predictor,
    stage_classes: Vec<i64>,
    risk: RiskSlot,
}

impl PredictionService {
    /// Assemble the service, checking the scalers against the fixed
    /// WDBC layout and the stage classes for consistency.
    pub fn new(
        diagnosis: Predictor,
        stage: Predictor,
        stage_classes: Vec<i64>,
        risk: Option<Predictor>,
        risk_artifacts: ArtifactConfig,
    ) -> Result<Self> {
        for (sub, predictor) in [(SubModel::Diagnosis, &diagnosis), (SubModel::Stage, &stage)] {
            ensure!(
                predictor.n_features() == WDBC_FEATURES,
                "{} scaler was fitted on {} features, expected {}",
                sub,
                predictor.n_features(),
                WDBC_FEATURES
            );
        }

        ensure!(!stage_classes.is_empty(), "stage model needs at least one class");
        let unique: HashSet<_> = stage_classes.iter().collect();
        ensure!(
            unique.len() == stage_classes.len(),
            "stage classes contain duplicates: {:?}",
            stage_classes
        );

        let risk = match risk {
            Some(predictor) => RiskSlot::Available(predictor),
            None => RiskSlot::Unavailable(risk_artifacts),
        };

        Ok(Self {
            diagnosis,
            stage,
            stage_classes,
            risk,
        })
    }

    pub fn risk_available(&self) -> bool {
        matches!(self.risk, RiskSlot::Available(_))
    }

    /// Feature count accepted by `/predict_risk`, when available
    pub fn risk_feature_count(&self) -> Option<usize> {
        match &self.risk {
            RiskSlot::Available(predictor) => Some(predictor.n_features()),
            RiskSlot::Unavailable(_) => None,
        }
    }

    pub fn stage_classes(&self) -> &[i64] {
        &self.stage_classes
    }

    /// DSO1: benign vs malignant
    pub fn predict_diagnosis(&self, features: &[f64]) -> Result<DiagnosisResponse, PredictError> {
        let sub = SubModel::Diagnosis;
        let scaled = self.diagnosis.prepare(sub, features, WDBC_FEATURES)?;
        let output = self.diagnosis.infer(sub, &scaled)?;

        let probability = output
            .positive_probability(true)
            .map_err(|e| PredictError::inference(sub, e))?;
        let diagnosis = Diagnosis::from_probability(probability);

        debug!(model = %sub, probability, diagnosis = %diagnosis, "Diagnosis predicted");

        Ok(DiagnosisResponse {
            probability_malignant: round_to(probability, 4),
            diagnosis: diagnosis.to_string(),
        })
    }

    /// DSO2: tumour stage
    pub fn predict_stage(&self, features: &[f64]) -> Result<StageResponse, PredictError> {
        let sub = SubModel::Stage;
        let scaled = self.stage.prepare(sub, features, WDBC_FEATURES)?;
        let output = self.stage.infer(sub, &scaled)?;

        let probabilities = output
            .aligned(&self.stage_classes)
            .map_err(|e| PredictError::inference(sub, e))?;

        let stage_code = match output.label {
            Some(label) => label,
            None => argmax(&probabilities)
                .map(|i| self.stage_classes[i])
                .context("empty probability output")
                .map_err(|e| PredictError::inference(sub, e))?,
        };

        let mut by_label: HashMap<String, f64> = self
            .stage_classes
            .iter()
            .zip(&probabilities)
            .map(|(&class, &p)| (stage_label(class), p))
            .collect();

        if !self.stage_classes.contains(&BENIGN_STAGE_CODE) {
            by_label.insert(stage_label(BENIGN_STAGE_CODE), 0.0);
        }

        debug!(model = %sub, stage_code, "Stage predicted");

        Ok(StageResponse {
            predicted_stage: stage_label(stage_code),
            stage_code,
            probabilities: by_label,
        })
    }

    /// DSO3: recurrence risk
    pub fn predict_risk(&self, features: &[f64]) -> Result<RiskResponse, PredictError> {
        let sub = SubModel::Risk;
        let predictor = match &self.risk {
            RiskSlot::Available(predictor) => predictor,
            RiskSlot::Unavailable(artifacts) => {
                return Err(PredictError::Unavailable {
                    model: sub,
                    model_file: artifacts.model.clone(),
                    scaler_file: artifacts.scaler.clone(),
                })
            }
        };

        let scaled = predictor.prepare(sub, features, predictor.n_features())?;
        let output = predictor.infer(sub, &scaled)?;

        let probability = output
            .positive_probability(false)
            .map_err(|e| PredictError::inference(sub, e))?;
        let level = RiskLevel::from_probability(probability);

        debug!(model = %sub, probability, level = %level, "Risk predicted");

        Ok(RiskResponse {
            future_risk_probability_percent: round_to(probability * 100.0, 2),
            risk_level: level.to_string(),
            probability_recurrence: probability,
        })
    }

    /// Body of `GET /`
    pub fn banner(&self) -> Banner {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            SubModel::Diagnosis.route().to_string(),
            format!("DSO1 - Benign/Malignant diagnosis ({WDBC_FEATURES} features)"),
        );
        endpoints.insert(
            SubModel::Stage.route().to_string(),
            "DSO2 - Tumour stage (Benign 0 to IV)".to_string(),
        );
        endpoints.insert(
            SubModel::Risk.route().to_string(),
            match self.risk_feature_count() {
                Some(n) => format!("DSO3 - Future recurrence risk ({n} features)"),
                None => "DSO3 unavailable".to_string(),
            },
        );

        Banner {
            message: "Welcome to the Ena Healthy API!".to_string(),
            title: "Ena Healthy - Breast Cancer AI Assistant".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoints,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub classifiers for service and handler tests

    use super::*;
    use crate::models::ClassifierOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed output and counts calls
    pub struct FixedClassifier {
        output: ClassifierOutput,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub fn new(output: ClassifierOutput) -> Arc<Self> {
            Arc::new(Self {
                output,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn infer(&self, _features: &[f32]) -> Result<ClassifierOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    /// Sigmoid of the mean scaled feature, deterministic in its input
    pub struct MeanSigmoid;

    impl Classifier for MeanSigmoid {
        fn name(&self) -> &str {
            "mean-sigmoid"
        }

        fn infer(&self, features: &[f32]) -> Result<ClassifierOutput> {
            let mean = features.iter().sum::<f32>() / features.len().max(1) as f32;
            Ok(ClassifierOutput::dense(vec![1.0 / (1.0 + (-mean).exp())]))
        }
    }

    /// Always fails
    pub struct Failing;

    impl Classifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn infer(&self, _features: &[f32]) -> Result<ClassifierOutput> {
            anyhow::bail!("runtime exploded")
        }
    }

    pub fn predictor(model: Arc<dyn Classifier>, n_features: usize) -> Predictor {
        Predictor::new(model, Scaler::identity(n_features))
    }

    pub fn risk_artifacts() -> ArtifactConfig {
        ArtifactConfig::new("risk.onnx", "risk_scaler.json")
    }

    /// Service over fixed outputs; risk enabled with 33 features when given
    pub fn service(
        diagnosis: Arc<dyn Classifier>,
        stage: Arc<dyn Classifier>,
        stage_classes: Vec<i64>,
        risk: Option<Arc<dyn Classifier>>,
    ) -> PredictionService {
        PredictionService::new(
            predictor(diagnosis, WDBC_FEATURES),
            predictor(stage, WDBC_FEATURES),
            stage_classes,
            risk.map(|model| predictor(model, 33)),
            risk_artifacts(),
        )
        .unwrap()
    }

    pub fn default_service() -> PredictionService {
        service(
            FixedClassifier::new(ClassifierOutput::dense(vec![0.9731])),
            FixedClassifier::new(
                ClassifierOutput::dense(vec![0.1, 0.6, 0.2, 0.1]).with_label(2),
            ),
            vec![1, 2, 3, 4],
            Some(FixedClassifier::new(ClassifierOutput::dense(vec![0.3, 0.7]))),
        )
    }
}
