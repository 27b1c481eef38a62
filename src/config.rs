//! Configuration types for segmentation operations

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default luminance cut-off for the heuristic scorer (0-255 scale)
pub const DEFAULT_LUMINANCE_THRESHOLD: u8 = 240;

/// Default probability cut-off for mask binarization
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

/// Which foreground scorer the pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    /// Deterministic luminance threshold, no model required
    #[default]
    Heuristic,
    /// External segmentation model
    Model,
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::Model => write!(f, "model"),
        }
    }
}

impl std::str::FromStr for ScorerKind {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" | "luminance" => Ok(Self::Heuristic),
            "model" => Ok(Self::Model),
            other => Err(SegmentationError::invalid_config(format!(
                "Unknown scorer '{other}' (expected 'heuristic' or 'model')"
            ))),
        }
    }
}

/// Memory layout of the model input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Batch, channels, height, width
    #[default]
    Nchw,
    /// Batch, height, width, channels
    Nhwc,
}

/// Activation applied to raw model outputs before they are used as scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Model already emits probabilities
    #[default]
    Identity,
    /// Model emits logits
    Sigmoid,
}

/// Settings for the model-backed collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: PathBuf,

    /// Model input size as (width, height)
    pub input_size: (u32, u32),

    /// Input tensor layout
    pub layout: TensorLayout,

    /// Per-channel mean subtracted after scaling pixels to [0, 1]
    pub normalization_mean: [f32; 3],

    /// Per-channel standard deviation divided after mean subtraction
    pub normalization_std: [f32; 3],

    /// Activation applied to the model output
    pub activation: OutputActivation,
}

impl ModelConfig {
    /// Model configuration with defaults suited to selfie-segmentation style networks
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            input_size: (256, 256),
            layout: TensorLayout::Nchw,
            normalization_mean: [0.0, 0.0, 0.0],
            normalization_std: [1.0, 1.0, 1.0],
            activation: OutputActivation::Identity,
        }
    }

    /// Validate model parameters
    ///
    /// # Errors
    /// - Zero input width or height
    /// - Non-positive or non-finite standard deviation
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.input_size;
        if width == 0 || height == 0 {
            return Err(SegmentationError::config_value_error(
                "model input size",
                format!("{width}x{height}"),
                "both dimensions > 0",
                Some("256x256".to_string()),
            ));
        }

        if self
            .normalization_std
            .iter()
            .any(|std| !std.is_finite() || *std <= 0.0)
        {
            return Err(SegmentationError::invalid_config(format!(
                "Normalization std must be positive and finite, got {:?}",
                self.normalization_std
            )));
        }

        if self.normalization_mean.iter().any(|mean| !mean.is_finite()) {
            return Err(SegmentationError::invalid_config(format!(
                "Normalization mean must be finite, got {:?}",
                self.normalization_mean
            )));
        }

        Ok(())
    }
}

/// Configuration for the segmentation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Foreground scorer selection
    pub scorer: ScorerKind,

    /// Heuristic scorer: pixels whose mean RGB is below this value are foreground
    pub luminance_threshold: u8,

    /// Binarizer: scores strictly greater than this value are foreground
    pub mask_threshold: f32,

    /// Model collaborator settings (required when `scorer` is `Model`)
    pub model: Option<ModelConfig>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerKind::default(),
            luminance_threshold: DEFAULT_LUMINANCE_THRESHOLD,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            model: None,
        }
    }
}

impl SegmentationConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgcutout::{ScorerKind, SegmentationConfig};
    ///
    /// let config = SegmentationConfig::builder()
    ///     .scorer(ScorerKind::Heuristic)
    ///     .luminance_threshold(230)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.luminance_threshold, 230);
    /// ```
    #[must_use]
    pub fn builder() -> SegmentationConfigBuilder {
        SegmentationConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Mask threshold: finite, `0.0 <= t < 1.0` so that a score of 1.0 is always foreground
    /// - Model scorer: requires a valid `ModelConfig`
    ///
    /// # Errors
    /// - Mask threshold out of range
    /// - Model scorer selected without model settings
    /// - Invalid model settings
    pub fn validate(&self) -> Result<()> {
        if !self.mask_threshold.is_finite() || !(0.0..1.0).contains(&self.mask_threshold) {
            return Err(SegmentationError::config_value_error(
                "mask threshold",
                self.mask_threshold,
                "0.0 <= t < 1.0",
                Some(DEFAULT_MASK_THRESHOLD),
            ));
        }

        match (self.scorer, &self.model) {
            (ScorerKind::Model, None) => Err(SegmentationError::invalid_config(
                "Model scorer selected but no model configured",
            )),
            (_, Some(model)) => model.validate(),
            (ScorerKind::Heuristic, None) => Ok(()),
        }
    }
}

/// Builder for `SegmentationConfig`
#[derive(Debug, Default)]
pub struct SegmentationConfigBuilder {
    config: SegmentationConfig,
}

impl SegmentationConfigBuilder {
    /// Set scorer kind
    #[must_use]
    pub fn scorer(mut self, scorer: ScorerKind) -> Self {
        self.config.scorer = scorer;
        self
    }

    /// Set luminance threshold for the heuristic scorer
    #[must_use]
    pub fn luminance_threshold(mut self, threshold: u8) -> Self {
        self.config.luminance_threshold = threshold;
        self
    }

    /// Set binarization threshold
    #[must_use]
    pub fn mask_threshold(mut self, threshold: f32) -> Self {
        self.config.mask_threshold = threshold;
        self
    }

    /// Set model settings and select the model scorer
    #[must_use]
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = Some(model);
        self.config.scorer = ScorerKind::Model;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any failure reported by [`SegmentationConfig::validate`]
    pub fn build(self) -> Result<SegmentationConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
