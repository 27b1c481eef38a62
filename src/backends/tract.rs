//! Tract segmentation model
//!
//! Runs a single-output ONNX segmentation network with Tract, a pure Rust
//! inference engine. The network sees the image at its fixed input size; its
//! output is squeezed to two dimensions and resampled to the source size.

use crate::{
    config::{ModelConfig, OutputActivation, TensorLayout},
    error::{Result, SegmentationError},
    inference::SegmentationModel,
    types::PixelBuffer,
    utils::{resize_scores, sigmoid, ModelInputBuilder},
};
use instant::Instant;
use ndarray::Array2;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX segmentation network executed with Tract
pub struct TractSegmentationModel {
    model: TractModel,
    config: ModelConfig,
    name: String,
}

impl TractSegmentationModel {
    /// Load, optimise and prepare the model described by `config`
    ///
    /// # Errors
    /// - Invalid model configuration
    /// - Missing model file
    /// - ONNX parsing, shape inference or optimisation failures
    pub fn load(config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let path = &config.path;

        if !path.is_file() {
            return Err(SegmentationError::model_error_with_context(
                "load",
                path,
                "file does not exist",
                &["check the --model path", "download the ONNX file first"],
            ));
        }

        let load_start = Instant::now();
        let (width, height) = (config.input_size.0 as usize, config.input_size.1 as usize);
        let input_shape = match config.layout {
            TensorLayout::Nchw => [1, 3, height, width],
            TensorLayout::Nhwc => [1, height, width, 3],
        };

        let context = |op: &'static str| {
            move |e: anyhow::Error| {
                SegmentationError::model_error_with_context(op, path, &e.to_string(), &[])
            }
        };

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(context("parse"))?
            .with_input_fact(0, f32::fact(input_shape).into())
            .map_err(context("set input shape for"))?
            .into_optimized()
            .map_err(context("optimize"))?
            .into_runnable()
            .map_err(context("prepare"))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx-model")
            .to_string();

        log::info!(
            "Loaded Tract model '{}' ({}x{} {:?}) in {}ms",
            name,
            width,
            height,
            config.layout,
            load_start.elapsed().as_millis()
        );

        Ok(Self {
            model,
            config: config.clone(),
            name,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Drop leading and trailing unit axes until two remain
    fn squeeze_output(output: &tract_ndarray::ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
        let mut shape = output.shape().to_vec();
        while shape.len() > 2 && shape.first() == Some(&1) {
            shape.remove(0);
        }
        while shape.len() > 2 && shape.last() == Some(&1) {
            shape.pop();
        }

        match shape.as_slice() {
            [rows, cols] => Array2::from_shape_vec((*rows, *cols), output.iter().copied().collect())
                .map_err(|e| SegmentationError::model(format!("Failed to reshape output: {e}"))),
            _ => Err(SegmentationError::model(format!(
                "Expected a single-channel mask output, got shape {:?}",
                output.shape()
            ))),
        }
    }
}

impl SegmentationModel for TractSegmentationModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn segment(&self, rgb: &PixelBuffer) -> Result<Option<Array2<f32>>> {
        let inference_start = Instant::now();
        let input: Tensor = ModelInputBuilder::build_tensor(rgb, &self.config)?.into();

        let outputs = self
            .model
            .run(tvec![input.into()])
            .map_err(|e| SegmentationError::model(format!("Tract inference failed: {e}")))?;

        let Some(first) = outputs.first() else {
            return Ok(None);
        };
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| SegmentationError::model(format!("Failed to read output tensor: {e}")))?;

        let mut scores = Self::squeeze_output(&view)?;
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(SegmentationError::model("Model produced non-finite values"));
        }
        if self.config.activation == OutputActivation::Sigmoid {
            scores = sigmoid(scores);
        }

        let scores = resize_scores(&scores, rgb.width(), rgb.height())?;

        log::debug!(
            "Tract inference on {}x{} image completed in {}ms",
            rgb.width(),
            rgb.height(),
            inference_start.elapsed().as_millis()
        );

        Ok(Some(scores))
    }
}
