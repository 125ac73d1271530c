//! Fitted feature scalers
//!
//! Scalers are exported from scikit-learn as JSON documents carrying the
//! fitted attributes (`mean_`/`scale_` for `StandardScaler`, `min_`/`scale_`
//! for `MinMaxScaler`).

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    #[default]
    Standard,
    MinMax,
}

/// On-disk layout of a scaler artifact
#[derive(Debug, Deserialize)]
struct ScalerFile {
    #[serde(default)]
    kind: ScalerKind,
    mean: Option<Vec<f64>>,
    min: Option<Vec<f64>>,
    scale: Vec<f64>,
}

/// Fitted transform from raw features to model inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Scaler {
    /// `(x - mean) / scale`; `mean` is absent when fitted with `with_mean=False`
    Standard {
        mean: Option<Vec<f64>>,
        scale: Vec<f64>,
    },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        Self::validated(Scaler::Standard {
            mean: Some(mean),
            scale,
        })
    }

    pub fn min_max(min: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        Self::validated(Scaler::MinMax { min, scale })
    }

    /// Scaler that leaves `n` features unchanged
    pub fn identity(n: usize) -> Self {
        Scaler::Standard {
            mean: None,
            scale: vec![1.0; n],
        }
    }

    /// Read and validate a scaler artifact
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid scaler in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: ScalerFile = serde_json::from_str(raw).context("Malformed scaler JSON")?;

        let scaler = match file.kind {
            ScalerKind::Standard => {
                if file.min.is_some() {
                    bail!("standard scaler does not take a `min` vector");
                }
                Scaler::Standard {
                    mean: file.mean,
                    scale: file.scale,
                }
            }
            ScalerKind::MinMax => {
                let min = file.min.context("min_max scaler requires a `min` vector")?;
                Scaler::MinMax {
                    min,
                    scale: file.scale,
                }
            }
        };

        Self::validated(scaler)
    }

    fn validated(scaler: Self) -> Result<Self> {
        let scale = scaler.scale();
        ensure!(!scale.is_empty(), "scaler has no features");

        let offset = match &scaler {
            Scaler::Standard { mean, .. } => mean.as_deref(),
            Scaler::MinMax { min, .. } => Some(min.as_slice()),
        };
        if let Some(offset) = offset {
            ensure!(
                offset.len() == scale.len(),
                "offset has {} entries but scale has {}",
                offset.len(),
                scale.len()
            );
            ensure!(
                offset.iter().all(|v| v.is_finite()),
                "offset contains non-finite values"
            );
        }
        ensure!(
            scale.iter().all(|v| v.is_finite()),
            "scale contains non-finite values"
        );

        Ok(scaler)
    }

    pub fn kind(&self) -> ScalerKind {
        match self {
            Scaler::Standard { .. } => ScalerKind::Standard,
            Scaler::MinMax { .. } => ScalerKind::MinMax,
        }
    }

    fn scale(&self) -> &[f64] {
        match self {
            Scaler::Standard { scale, .. } | Scaler::MinMax { scale, .. } => scale,
        }
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.scale().len()
    }

    /// Apply the transform. Callers validate the length beforehand.
    pub fn transform(&self, features: &[f64]) -> Vec<f32> {
        debug_assert_eq!(features.len(), self.n_features());

        match self {
            Scaler::Standard { mean, scale } => features
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    let centered = match mean {
                        Some(mean) => x - mean[i],
                        None => x,
                    };
                    // zero variance columns are left unscaled
                    let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
                    (centered / s) as f32
                })
                .collect(),
            Scaler::MinMax { min, scale } => features
                .iter()
                .zip(scale.iter().zip(min))
                .map(|(&x, (&s, &m))| (x * s + m) as f32)
                .collect(),
        }
    }
}
