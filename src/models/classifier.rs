//! Classifier abstraction shared by the ONNX runtime and test doubles

use anyhow::{bail, ensure, Context, Result};

/// Class probabilities as emitted by a model
#[derive(Debug, Clone, PartialEq)]
pub enum Probabilities {
    /// One column per fitted class, in fitting order
    Dense(Vec<f32>),
    /// `(class, probability)` pairs, e.g. skl2onnx ZipMap output
    Keyed(Vec<(i64, f32)>),
}

/// Raw output of a single-row inference
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    /// Predicted class when the model emits one
    pub label: Option<i64>,
    pub probabilities: Probabilities,
}

impl ClassifierOutput {
    pub fn dense(probabilities: Vec<f32>) -> Self {
        Self {
            label: None,
            probabilities: Probabilities::Dense(probabilities),
        }
    }

    pub fn keyed(probabilities: Vec<(i64, f32)>) -> Self {
        Self {
            label: None,
            probabilities: Probabilities::Keyed(probabilities),
        }
    }

    pub fn with_label(mut self, label: i64) -> Self {
        self.label = Some(label);
        self
    }

    /// Probability of the positive class of a binary model.
    ///
    /// A two-class output yields column 1 (or key 1). A width-1 output,
    /// such as a sigmoid head, is only accepted with `allow_single_column`.
    pub fn positive_probability(&self, allow_single_column: bool) -> Result<f64> {
        let p = match &self.probabilities {
            Probabilities::Dense(columns) => match columns.len() {
                1 if allow_single_column => columns[0],
                2 => columns[1],
                n => bail!("expected a binary probability output, got {n} columns"),
            },
            Probabilities::Keyed(pairs) => {
                ensure!(
                    pairs.len() == 2 || (allow_single_column && pairs.len() == 1),
                    "expected a binary probability output, got {} classes",
                    pairs.len()
                );
                pairs
                    .iter()
                    .find(|(class, _)| *class == 1)
                    .map(|(_, p)| *p)
                    .context("no probability for class 1")?
            }
        };

        let p = p as f64;
        ensure!(
            (0.0..=1.0).contains(&p),
            "probability {p} is outside [0, 1]"
        );
        Ok(p)
    }

    /// Probabilities reordered to match `classes`
    pub fn aligned(&self, classes: &[i64]) -> Result<Vec<f64>> {
        match &self.probabilities {
            Probabilities::Dense(columns) => {
                ensure!(
                    columns.len() == classes.len(),
                    "model returned {} probabilities for {} classes",
                    columns.len(),
                    classes.len()
                );
                Ok(columns.iter().map(|&p| p as f64).collect())
            }
            Probabilities::Keyed(pairs) => {
                ensure!(
                    pairs.len() == classes.len(),
                    "model returned {} probabilities for {} classes",
                    pairs.len(),
                    classes.len()
                );
                classes
                    .iter()
                    .map(|class| {
                        pairs
                            .iter()
                            .find(|(key, _)| key == class)
                            .map(|(_, p)| *p as f64)
                            .with_context(|| format!("no probability for class {class}"))
                    })
                    .collect()
            }
        }
    }
}

/// A loaded, immutable classifier
pub trait Classifier: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run inference on one already-scaled feature row
    fn infer(&self, features: &[f32]) -> Result<ClassifierOutput>;
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
