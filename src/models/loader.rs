//! Startup loading of model and scaler artifacts

use crate::config::{ArtifactConfig, ModelsConfig};
use crate::models::inference::OnnxClassifier;
use crate::models::scaler::Scaler;
use crate::models::SubModel;
use crate::service::{PredictionService, Predictor};
use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Resolved paths of one model/scaler pair
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPair {
    pub fn resolve(models_dir: &Path, artifacts: &ArtifactConfig) -> Self {
        Self {
            model: models_dir.join(&artifacts.model),
            scaler: models_dir.join(&artifacts.scaler),
        }
    }

    /// Files of the pair that do not exist
    pub fn missing(&self) -> Vec<&Path> {
        [self.model.as_path(), self.scaler.as_path()]
            .into_iter()
            .filter(|p| !p.exists())
            .collect()
    }
}

/// Artifacts found on disk at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub diagnosis: ArtifactPair,
    pub stage: ArtifactPair,
    /// `None` when either DSO3 file is absent
    pub risk: Option<ArtifactPair>,
}

/// Locate artifacts. Missing required files are an error; a missing
/// optional pair only disables its endpoint.
pub fn discover(config: &ModelsConfig) -> Result<ArtifactSet> {
    let dir = config.models_dir();

    let required = |sub: SubModel, artifacts: &ArtifactConfig| -> Result<ArtifactPair> {
        let pair = ArtifactPair::resolve(&dir, artifacts);
        let missing = pair.missing();
        if !missing.is_empty() {
            bail!(
                "{} artifacts missing: {}",
                sub,
                missing
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(pair)
    };

    let diagnosis = required(SubModel::Diagnosis, &config.diagnosis)?;
    let stage = required(SubModel::Stage, &config.stage.artifacts())?;

    let risk_pair = ArtifactPair::resolve(&dir, &config.risk);
    let missing = risk_pair.missing();
    let risk = if missing.is_empty() {
        Some(risk_pair)
    } else {
        warn!(
            model = %SubModel::Risk,
            missing = ?missing,
            "Artifacts missing, endpoint disabled"
        );
        None
    };

    Ok(ArtifactSet {
        diagnosis,
        stage,
        risk,
    })
}

/// Loader for ONNX models and their scalers
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_classifier<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<OnnxClassifier> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let classifier = OnnxClassifier::new(name, session);

        info!(
            model = %name,
            input = %classifier.input_name(),
            probabilities = %classifier.probability_output(),
            label = ?classifier.label_output(),
            "Model loaded successfully"
        );

        Ok(classifier)
    }

    /// Load a model/scaler pair
    pub fn load_predictor(&self, sub: SubModel, pair: &ArtifactPair) -> Result<Predictor> {
        let model = self
            .load_classifier(&pair.model, sub.name())
            .with_context(|| format!("{sub} model"))?;
        let scaler = Scaler::from_path(&pair.scaler).with_context(|| format!("{sub} scaler"))?;

        info!(
            model = %sub,
            scaler = ?scaler.kind(),
            features = scaler.n_features(),
            "Model and scaler loaded"
        );

        Ok(Predictor::new(Arc::new(model), scaler))
    }

    /// Discover and load every sub-model into an immutable service
    pub fn load_service(&self, config: &ModelsConfig) -> Result<PredictionService> {
        let artifacts = discover(config)?;

        let diagnosis = self.load_predictor(SubModel::Diagnosis, &artifacts.diagnosis)?;
        let stage = self.load_predictor(SubModel::Stage, &artifacts.stage)?;
        info!(
            model = %SubModel::Stage,
            classes = ?config.stage.classes,
            "Stage model has {} classes",
            config.stage.classes.len()
        );

        let risk = artifacts
            .risk
            .as_ref()
            .map(|pair| self.load_predictor(SubModel::Risk, pair))
            .transpose()?;

        PredictionService::new(
            diagnosis,
            stage,
            config.stage.classes.clone(),
            risk,
            config.risk.clone(),
        )
    }
}
