#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # bgcutout
//!
//! Subject cutout for product and portrait photos: decode an image, score each
//! pixel as foreground or background, threshold the scores into a binary mask,
//! locate the main subject and composite a transparent PNG.
//!
//! ## Features
//!
//! - **Two scorers**: a deterministic luminance heuristic and an adapter over
//!   any [`SegmentationModel`]
//! - **Pure Rust model backend**: ONNX segmentation networks through Tract
//!   (`tract` feature), loaded lazily on first use
//! - **Subject localisation**: bounding box of the largest external region,
//!   with holes filled
//! - **Transport-ready output**: PNG cutout and mask, base64 JSON envelope
//! - **CLI** (`cli` feature) and **HTTP server** (`server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgcutout::{segment_bytes, SegmentationConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let bytes = std::fs::read("product.jpg")?;
//! let result = segment_bytes(&bytes, &SegmentationConfig::default())?;
//! result.save_cutout("product_cutout.png")?;
//! println!("subject at {}", result.bounding_box);
//! # Ok(())
//! # }
//! ```
//!
//! ## Model scorer
//!
//! ```rust,no_run
//! use bgcutout::{ModelConfig, SegmentationConfig, SegmentationPipeline};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = SegmentationConfig::builder()
//!     .model(ModelConfig::new("models/selfie_segmentation.onnx"))
//!     .build()?;
//! let pipeline = SegmentationPipeline::new(config)?;
//! let result = pipeline.process_file("portrait.jpg")?;
//! result.save_mask("portrait_mask.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Tract ONNX model collaborator
//! - `cli` (default): `bgcutout` command-line tool
//! - `server` (default): `bgcutout-server` HTTP API
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON log output for the binaries
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! bgcutout = { version = "0.1", default-features = false, features = ["tract"] }
//! ```

pub mod api;
pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod postprocessing;
pub mod processor;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use api::{ErrorResponse, SegmentationResponse};
pub use backends::{HeuristicScorer, ModelHandle, ModelScorer};
#[cfg(feature = "tract")]
pub use backends::TractSegmentationModel;
pub use config::{
    ModelConfig, OutputActivation, ScorerKind, SegmentationConfig, SegmentationConfigBuilder,
    TensorLayout, DEFAULT_LUMINANCE_THRESHOLD, DEFAULT_MASK_THRESHOLD,
};
pub use error::{Result, SegmentationError};
pub use inference::{ForegroundScorer, SegmentationModel};
pub use postprocessing::{BoundingBoxExtractor, Compositor, MaskBinarizer, Region};
pub use processor::{DefaultScorerFactory, ScorerFactory, SegmentationPipeline};
pub use services::{ImageIOService, OutputFormatHandler};
pub use tracing_config::{spans, TracingConfig, TracingFormat};
#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
pub use types::{
    BinaryMask, BoundingBox, ChannelLayout, CutoutImage, MaskStatistics, PixelBuffer,
    ProcessingTimings, ScoreMap, SegmentationOutput, SegmentationResult, MASK_BACKGROUND,
    MASK_FOREGROUND,
};

/// Segment an image provided as encoded bytes
///
/// Suitable for web handlers and other in-memory sources. Builds a pipeline
/// from `config`; reuse a [`SegmentationPipeline`] when processing many images
/// with a model scorer so the model is loaded once.
///
/// # Examples
/// ```rust,no_run
/// use bgcutout::{segment_bytes, SegmentationConfig};
///
/// # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = SegmentationConfig::builder().luminance_threshold(230).build()?;
/// let result = segment_bytes(&upload, &config)?;
/// assert!(result.bounding_box.fits_within(result.source_width, result.source_height));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - Invalid configuration
/// - Any failure reported by [`SegmentationPipeline::process_bytes`]
pub fn segment_bytes(image_bytes: &[u8], config: &SegmentationConfig) -> Result<SegmentationResult> {
    SegmentationPipeline::new(config.clone())?.process_bytes(image_bytes)
}

/// Segment an already decoded `DynamicImage`
///
/// # Errors
/// - Zero-sized image
/// - Invalid configuration
/// - Any failure reported by [`SegmentationPipeline::process_buffer`]
pub fn segment_image(
    image: &image::DynamicImage,
    config: &SegmentationConfig,
) -> Result<SegmentationResult> {
    let buffer = PixelBuffer::from_dynamic(image)?;
    SegmentationPipeline::new(config.clone())?.process_buffer(&buffer)
}

/// Segment an image read from an async stream
///
/// # Examples
/// ```rust,no_run
/// use bgcutout::{segment_from_reader, SegmentationConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("product.png").await?;
/// let result = segment_from_reader(file, &SegmentationConfig::default()).await?;
/// result.save_cutout("product_cutout.png")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - Stream read failures
/// - Any failure reported by [`segment_bytes`]
pub async fn segment_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    config: &SegmentationConfig,
) -> Result<SegmentationResult> {
    SegmentationPipeline::new(config.clone())?
        .process_reader(reader)
        .await
}
