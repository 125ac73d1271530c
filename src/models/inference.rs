//! ONNX Runtime backed classifier

use crate::models::classifier::{Classifier, ClassifierOutput};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// A loaded ONNX classifier.
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// mutex; concurrent requests to the same model are serialised.
pub struct OnnxClassifier {
    /// Model name
    name: String,
    /// ONNX Runtime session
    session: Mutex<Session>,
    /// Input name for the feature row
    input_name: String,
    /// Output carrying the predicted class, if any
    label_output: Option<String>,
    /// Output carrying class probabilities
    probability_output: String,
}

impl OnnxClassifier {
    /// Wrap a committed session, picking its input and output names
    pub fn new(name: &str, session: Session) -> Self {
        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn label_output(&self) -> Option<&str> {
        self.label_output.as_deref()
    }

    pub fn probability_output(&self) -> &str {
        &self.probability_output
    }

    /// Extract class probabilities, trying the configured output first.
    /// Handles tensor outputs (Keras, XGBoost) and seq(map) outputs (skl2onnx ZipMap).
    fn extract_probabilities(&self, outputs: &SessionOutputs) -> Result<ClassifierOutput> {
        if let Some(output) = outputs.get(self.probability_output.as_str()) {
            if let Some(parsed) = self.try_extract(output)? {
                return Ok(parsed);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") || name == self.probability_output {
                continue;
            }
            if let Some(parsed) = self.try_extract(&output)? {
                debug!(model = %self.name, output = %name, "Extracted probabilities (fallback)");
                return Ok(parsed);
            }
        }

        anyhow::bail!("{}: no probability output found", self.name)
    }

    fn try_extract(&self, output: &DynValue) -> Result<Option<ClassifierOutput>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Ok(Some(ClassifierOutput::dense(first_row(&dims, data))));
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output).map(Some);
        }

        Ok(None)
    }

    /// Extract `(class, probability)` pairs from seq(map(int64, float))
    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<ClassifierOutput> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        // batch size is always 1
        let map_value = maps.first().context("Empty sequence")?;

        let mut pairs = map_value.try_extract_key_values::<i64, f32>()?;
        pairs.sort_by_key(|(class, _)| *class);

        debug!(model = %self.name, classes = pairs.len(), "Extracted from seq(map)");
        Ok(ClassifierOutput::keyed(pairs))
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Option<i64> {
        let name = self.label_output.as_deref()?;
        let output = outputs.get(name)?;
        let (_, data) = output.try_extract_tensor::<i64>().ok()?;
        data.first().copied()
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&self, features: &[f32]) -> Result<ClassifierOutput> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        let mut parsed = self.extract_probabilities(&outputs)?;
        parsed.label = self.extract_label(&outputs);

        debug!(model = %self.name, output = ?parsed, "Inference complete");
        Ok(parsed)
    }
}

/// First row of a `[batch, classes]` or `[classes]` tensor
fn first_row(dims: &[i64], data: &[f32]) -> Vec<f32> {
    let width = match dims.last() {
        Some(&w) if w > 0 => (w as usize).min(data.len()),
        _ => data.len(),
    };
    data[..width].to_vec()
}
