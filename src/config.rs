//! Configuration management for the prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`]
pub const CONFIG_PATH_ENV: &str = "ENA_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
    /// Answer validation errors with 400 and unavailable models with 503
    /// instead of 200 with an `error` key
    pub strict_status_codes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            strict_status_codes: false,
        }
    }
}

/// Model artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing ONNX models and scaler files
    pub models_dir: String,
    /// Number of intra-op threads per ONNX session
    pub onnx_threads: usize,
    /// DSO1 diagnosis artifacts
    pub diagnosis: ArtifactConfig,
    /// DSO2 stage artifacts
    pub stage: StageArtifactConfig,
    /// DSO3 recurrence-risk artifacts (optional on disk)
    pub risk: ArtifactConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            onnx_threads: 1,
            diagnosis: ArtifactConfig::new("diagnosis.onnx", "diagnosis_scaler.json"),
            stage: StageArtifactConfig::default(),
            risk: ArtifactConfig::new("risk.onnx", "risk_scaler.json"),
        }
    }
}

impl ModelsConfig {
    pub fn models_dir(&self) -> PathBuf {
        PathBuf::from(&self.models_dir)
    }
}

/// File names of a model/scaler pair inside `models_dir`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArtifactConfig {
    pub model: String,
    pub scaler: String,
}

impl ArtifactConfig {
    pub fn new(model: &str, scaler: &str) -> Self {
        Self {
            model: model.to_string(),
            scaler: scaler.to_string(),
        }
    }
}

/// Stage artifacts plus the class codes the stage model was fitted on
#[derive(Debug, Clone, Deserialize)]
pub struct StageArtifactConfig {
    pub model: String,
    pub scaler: String,
    #[serde(default = "default_stage_classes")]
    pub classes: Vec<i64>,
}

impl StageArtifactConfig {
    pub fn artifacts(&self) -> ArtifactConfig {
        ArtifactConfig::new(&self.model, &self.scaler)
    }
}

impl Default for StageArtifactConfig {
    fn default() -> Self {
        Self {
            model: "stage.onnx".to_string(),
            scaler: "stage_scaler.json".to_string(),
            classes: default_stage_classes(),
        }
    }
}

fn default_stage_classes() -> Vec<i64> {
    vec![0, 1, 2, 3, 4]
}

/// Periodic metrics summary configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summaries (0 disables the reporter)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `ENA_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, layered with `ENA_*` variables.
    ///
    /// A missing file is not an error: every field has a default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("ENA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
