//! ONNX-backed sales predictor

use crate::config::ModelConfig;
use crate::feature_deriver::{FeatureVector, FEATURE_COUNT};
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::predictor::SalesPredictor;
use anyhow::{Context, Result};
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::{debug, info};

/// Sales regression model served through ONNX Runtime.
///
/// `Session::run` needs exclusive access, so concurrent merchant pipelines
/// take turns on the session mutex.
pub struct OnnxSalesPredictor {
    model: Mutex<LoadedModel>,
    name: String,
}

impl OnnxSalesPredictor {
    /// Load the predictor described by the model configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads);
        let model = loader.load_model(&config.path)?;
        Ok(Self::from_model(model))
    }

    /// Wrap an already loaded model
    pub fn from_model(model: LoadedModel) -> Self {
        let name = model.name.clone();
        info!(model = %name, features = FEATURE_COUNT, "Sales predictor ready");
        Self {
            model: Mutex::new(model),
            name,
        }
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: [f32; FEATURE_COUNT]) -> Result<f64> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let model = &mut *model;

        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input_tensor =
            Tensor::from_array((shape, input.to_vec())).context("Failed to create input tensor")?;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        if let Some(output) = outputs.get(model.output_name.as_str()) {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    return Ok(f64::from(value));
                }
            }
        }

        // Fall back to the first output holding an f32 tensor
        for (name, output) in outputs.iter() {
            if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
                if let Some(&value) = data.first() {
                    debug!(model = %model.name, output = %name, "Extracted prediction (fallback)");
                    return Ok(f64::from(value));
                }
            }
        }

        anyhow::bail!("Model {} produced no numeric output", model.name)
    }
}

impl SalesPredictor for OnnxSalesPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let prediction = self
            .run(features.to_input())
            .with_context(|| format!("Inference failed for model {}", self.name))?;

        debug!(
            model = %self.name,
            month_index = features.month_index,
            prediction = prediction,
            "Model inference complete"
        );

        Ok(prediction)
    }
}
