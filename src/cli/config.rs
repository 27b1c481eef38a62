//! Pipeline flags shared by the CLI and the server binary

use crate::config::{
    ModelConfig, OutputActivation, ScorerKind, SegmentationConfig, TensorLayout,
    DEFAULT_LUMINANCE_THRESHOLD, DEFAULT_MASK_THRESHOLD,
};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Scorer selection on the command line
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliScorer {
    Heuristic,
    Model,
}

impl From<CliScorer> for ScorerKind {
    fn from(value: CliScorer) -> Self {
        match value {
            CliScorer::Heuristic => Self::Heuristic,
            CliScorer::Model => Self::Model,
        }
    }
}

/// Flags that configure the segmentation pipeline
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Foreground scorer [default: model when --model is given, otherwise heuristic]
    #[arg(long, value_enum)]
    pub scorer: Option<CliScorer>,

    /// Path to an ONNX segmentation model
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Model input size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub model_input_size: Option<(u32, u32)>,

    /// Model expects NHWC input instead of NCHW
    #[arg(long)]
    pub nhwc: bool,

    /// Apply a sigmoid to raw model outputs
    #[arg(long)]
    pub sigmoid: bool,

    /// Scores strictly above this value become foreground
    #[arg(long, default_value_t = DEFAULT_MASK_THRESHOLD)]
    pub mask_threshold: f32,

    /// Heuristic scorer: pixels with mean RGB below this value are foreground
    #[arg(long, default_value_t = DEFAULT_LUMINANCE_THRESHOLD)]
    pub luminance_threshold: u8,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log filter directives such as "bgcutout=debug,tower_http=info" (overrides -v and RUST_LOG)
    #[arg(long, value_name = "DIRECTIVES")]
    pub log_filter: Option<String>,
}

impl PipelineArgs {
    /// Build a validated `SegmentationConfig` from the flags
    ///
    /// # Errors
    /// - Model scorer requested without `--model`
    /// - Any failure reported by [`SegmentationConfig::validate`]
    pub fn to_config(&self) -> Result<SegmentationConfig> {
        let scorer = match (self.scorer, &self.model) {
            (Some(scorer), _) => ScorerKind::from(scorer),
            (None, Some(_)) => ScorerKind::Model,
            (None, None) => ScorerKind::Heuristic,
        };

        let model = self.model.as_ref().map(|path| {
            let mut model = ModelConfig::new(path);
            if let Some(size) = self.model_input_size {
                model.input_size = size;
            }
            if self.nhwc {
                model.layout = TensorLayout::Nhwc;
            }
            if self.sigmoid {
                model.activation = OutputActivation::Sigmoid;
            }
            model
        });

        let config = SegmentationConfig {
            scorer,
            luminance_threshold: self.luminance_threshold,
            mask_threshold: self.mask_threshold,
            model,
        };
        config.validate().context("Invalid pipeline options")?;
        Ok(config)
    }
}

/// Parse `WIDTHxHEIGHT`
pub(crate) fn parse_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{value}'"))?;

    if width == 0 || height == 0 {
        return Err(format!("dimensions must be positive, got '{value}'"));
    }
    Ok((width, height))
}
