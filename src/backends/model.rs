//! Model-backed foreground scorer
//!
//! [`ModelScorer`] adapts an external [`SegmentationModel`] to the
//! [`ForegroundScorer`] seam and validates everything the collaborator hands
//! back. [`ModelHandle`] defers construction of the collaborator until the
//! first request and shares it afterwards.

use crate::{
    error::{Result, SegmentationError},
    inference::{ForegroundScorer, SegmentationModel},
    types::{PixelBuffer, ScoreMap},
};
use instant::Instant;
use ndarray::Array2;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Largest distance outside [0, 1] that is treated as rounding noise
const CLAMP_TOLERANCE: f32 = 1e-3;

type ModelInit = Box<dyn Fn() -> Result<Arc<dyn SegmentationModel>> + Send + Sync>;

/// Lazily constructed, shared segmentation model
///
/// The initialiser runs at most once successfully. Concurrent first callers
/// block until it completes. When it fails, the error is returned to the
/// caller and the next call tries again.
pub struct ModelHandle {
    label: String,
    cell: OnceCell<Arc<dyn SegmentationModel>>,
    init: Option<ModelInit>,
}

impl ModelHandle {
    /// Handle that builds the model on first use
    ///
    /// # Examples
    /// ```rust,no_run
    /// # #[cfg(feature = "tract")]
    /// # {
    /// use bgcutout::{backends::{ModelHandle, TractSegmentationModel}, ModelConfig};
    /// use std::sync::Arc;
    ///
    /// let config = ModelConfig::new("selfie_segmentation.onnx");
    /// let handle = ModelHandle::lazy("selfie", move || {
    ///     Ok(Arc::new(TractSegmentationModel::load(&config)?) as _)
    /// });
    /// assert!(!handle.is_initialized());
    /// # }
    /// ```
    pub fn lazy<F>(label: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SegmentationModel>> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            cell: OnceCell::new(),
            init: Some(Box::new(init)),
        }
    }

    /// Handle around an already constructed model
    pub fn ready(model: Arc<dyn SegmentationModel>) -> Self {
        Self {
            label: model.name().to_string(),
            cell: OnceCell::with_value(model),
            init: None,
        }
    }

    /// Get the model, constructing it if this is the first successful call
    ///
    /// # Errors
    /// - Initialiser failure, reported as a model error
    pub fn get(&self) -> Result<&Arc<dyn SegmentationModel>> {
        self.cell.get_or_try_init(|| {
            let init = self.init.as_ref().ok_or_else(|| {
                SegmentationError::model(format!("No initialiser for model '{}'", self.label))
            })?;

            let start = Instant::now();
            tracing::info!(model = %self.label, "Initialising segmentation model");

            let model = init().map_err(|e| match e {
                SegmentationError::Model(_) => e,
                other => SegmentationError::model(format!(
                    "Failed to initialise model '{}': {other}",
                    self.label
                )),
            });

            match &model {
                Ok(_) => tracing::info!(
                    model = %self.label,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Segmentation model ready"
                ),
                Err(e) => tracing::warn!(model = %self.label, error = %e, "Model initialisation failed"),
            }

            model
        })
    }

    /// Whether the model has been constructed
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("label", &self.label)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Scorer that delegates to an external segmentation model
#[derive(Debug)]
pub struct ModelScorer {
    handle: ModelHandle,
}

impl ModelScorer {
    #[must_use]
    pub fn new(handle: ModelHandle) -> Self {
        Self { handle }
    }

    /// Scorer around a model that is already loaded
    pub fn from_model<M: SegmentationModel + 'static>(model: M) -> Self {
        Self::new(ModelHandle::ready(Arc::new(model)))
    }

    #[must_use]
    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Check the collaborator output against the source and normalise it
    fn validate_output(raw: Array2<f32>, width: u32, height: u32) -> Result<Array2<f32>> {
        let expected = (height as usize, width as usize);
        if raw.dim() != expected {
            let (rows, cols) = raw.dim();
            return Err(SegmentationError::model(format!(
                "Model returned {cols}x{rows} scores for a {width}x{height} image"
            )));
        }

        if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
            return Err(SegmentationError::model(format!(
                "Model returned non-finite score {bad}"
            )));
        }

        let out_of_range = raw
            .iter()
            .filter(|v| **v < -CLAMP_TOLERANCE || **v > 1.0 + CLAMP_TOLERANCE)
            .count();
        if out_of_range > 0 {
            log::debug!("Clamping {out_of_range} model scores that lie outside [0, 1]");
        }

        Ok(raw.mapv_into(|v| v.clamp(0.0, 1.0)))
    }
}

impl ForegroundScorer for ModelScorer {
    fn name(&self) -> &str {
        "model"
    }

    fn score(&self, image: &PixelBuffer) -> Result<ScoreMap> {
        let model = self.handle.get()?;
        let rgb = image.to_rgb();
        let (width, height) = rgb.dimensions();

        let raw = model
            .segment(&rgb)
            .map_err(|e| match e {
                SegmentationError::Model(_) => e,
                other => SegmentationError::model(format!(
                    "Model '{}' failed: {other}",
                    model.name()
                )),
            })?
            .ok_or_else(|| {
                SegmentationError::model(format!(
                    "Model '{}' did not produce a mask",
                    model.name()
                ))
            })?;

        ScoreMap::new(Self::validate_output(raw, width, height)?)
    }
}
