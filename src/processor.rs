//! Segmentation pipeline
//!
//! This module provides the `SegmentationPipeline` that wires the stages
//! together: decode, score, binarize, locate the subject, composite and
//! encode. The library functions, the CLI and the HTTP server all go
//! through it so they behave identically.

use crate::{
    backends::HeuristicScorer,
    config::{ScorerKind, SegmentationConfig},
    error::{Result, SegmentationError},
    inference::ForegroundScorer,
    postprocessing::{BoundingBoxExtractor, Compositor, MaskBinarizer},
    services::{ImageIOService, OutputFormatHandler},
    types::{PixelBuffer, ProcessingTimings, SegmentationOutput, SegmentationResult},
};
use instant::Instant;
use log::{debug, info};
use std::{path::Path, sync::Arc};
use tracing::{instrument, span, Level};

/// Factory trait for creating foreground scorers
pub trait ScorerFactory: Send + Sync {
    /// Create the scorer selected by `config`
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError` for:
    /// - Scorer kinds not compiled into this build
    /// - Missing model settings
    fn create_scorer(&self, config: &SegmentationConfig) -> Result<Arc<dyn ForegroundScorer>>;

    /// List available scorer kinds
    fn available_scorers(&self) -> Vec<ScorerKind>;
}

/// Default scorer factory
///
/// The heuristic scorer is always available. The model scorer uses the Tract
/// collaborator when the `tract` feature is enabled; the model file is loaded
/// on the first request, not here.
pub struct DefaultScorerFactory;

impl ScorerFactory for DefaultScorerFactory {
    fn create_scorer(&self, config: &SegmentationConfig) -> Result<Arc<dyn ForegroundScorer>> {
        match config.scorer {
            ScorerKind::Heuristic => Ok(Arc::new(HeuristicScorer::new(config.luminance_threshold))),
            ScorerKind::Model => Self::create_model_scorer(config),
        }
    }

    fn available_scorers(&self) -> Vec<ScorerKind> {
        if cfg!(feature = "tract") {
            vec![ScorerKind::Heuristic, ScorerKind::Model]
        } else {
            vec![ScorerKind::Heuristic]
        }
    }
}

impl DefaultScorerFactory {
    #[cfg(feature = "tract")]
    fn create_model_scorer(config: &SegmentationConfig) -> Result<Arc<dyn ForegroundScorer>> {
        use crate::backends::{ModelHandle, ModelScorer, TractSegmentationModel};

        let model_config = config.model.clone().ok_or_else(|| {
            SegmentationError::invalid_config("Model scorer selected but no model configured")
        })?;
        let label = model_config.path.display().to_string();

        let handle = ModelHandle::lazy(label, move || {
            let model = TractSegmentationModel::load(&model_config)?;
            Ok(Arc::new(model) as Arc<dyn crate::inference::SegmentationModel>)
        });
        Ok(Arc::new(ModelScorer::new(handle)))
    }

    #[cfg(not(feature = "tract"))]
    fn create_model_scorer(_config: &SegmentationConfig) -> Result<Arc<dyn ForegroundScorer>> {
        Err(SegmentationError::invalid_config(
            "Model scorer requires the 'tract' feature or a custom ScorerFactory",
        ))
    }
}

/// Stateless, shareable segmentation pipeline
///
/// Holds only the validated configuration and the scorer, so one instance
/// can serve concurrent requests behind an `Arc`.
#[derive(Clone)]
pub struct SegmentationPipeline {
    config: SegmentationConfig,
    scorer: Arc<dyn ForegroundScorer>,
}

impl SegmentationPipeline {
    /// Create a pipeline with the default scorer factory
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError` for:
    /// - Invalid configuration
    /// - Scorer kinds not available in this build
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        Self::with_factory(config, &DefaultScorerFactory)
    }

    /// Create a pipeline with a custom scorer factory
    ///
    /// # Errors
    ///
    /// Returns `SegmentationError` for:
    /// - Invalid configuration
    /// - Scorer creation failures
    pub fn with_factory(config: SegmentationConfig, factory: &dyn ScorerFactory) -> Result<Self> {
        config.validate()?;
        let scorer = factory.create_scorer(&config)?;
        info!(
            "Segmentation pipeline ready (scorer: {}, mask threshold: {})",
            scorer.name(),
            config.mask_threshold
        );
        Ok(Self { config, scorer })
    }

    /// Create a pipeline around an existing scorer
    ///
    /// The scorer replaces whatever `config.scorer` selects; the thresholds
    /// in `config` still apply.
    ///
    /// # Errors
    /// - Invalid mask threshold
    pub fn with_scorer(config: SegmentationConfig, scorer: Arc<dyn ForegroundScorer>) -> Result<Self> {
        let mut check = config.clone();
        check.model = None;
        check.scorer = ScorerKind::Heuristic;
        check.validate()?;
        Ok(Self { config, scorer })
    }

    #[must_use]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    #[must_use]
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Run scoring and postprocessing on a decoded image
    ///
    /// # Errors
    /// - Scorer failures
    /// - Scorer output whose dimensions differ from the image
    pub fn segment(&self, image: &PixelBuffer) -> Result<SegmentationOutput> {
        let mut timings = ProcessingTimings::default();
        self.segment_timed(image, &mut timings)
    }

    /// Segment a decoded image and encode the outputs
    ///
    /// # Errors
    /// - Scorer failures
    /// - PNG encoding failures
    pub fn process_buffer(&self, image: &PixelBuffer) -> Result<SegmentationResult> {
        self.run(image, ProcessingTimings::default(), Instant::now())
    }

    /// Decode, segment and encode an image held in memory
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcutout::{SegmentationConfig, SegmentationPipeline};
    ///
    /// let pipeline = SegmentationPipeline::new(SegmentationConfig::default())?;
    /// let bytes = std::fs::read("product.jpg")?;
    /// let result = pipeline.process_bytes(&bytes)?;
    /// println!("subject at {}", result.bounding_box);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// Returns `SegmentationError` for:
    /// - Image decoding failures
    /// - Scorer failures
    /// - PNG encoding failures
    #[instrument(skip(self, bytes), fields(input_bytes = bytes.len(), scorer = %self.scorer.name()))]
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<SegmentationResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        let image = {
            let _span = span!(Level::DEBUG, "decode").entered();
            let decode_start = Instant::now();
            let image = ImageIOService::decode(bytes)?;
            timings.decode_ms = decode_start.elapsed().as_millis() as u64;
            image
        };

        self.run(&image, timings, total_start)
    }

    /// Load and process an image file
    ///
    /// # Errors
    /// - File I/O errors
    /// - Any failure reported by [`SegmentationPipeline::process_bytes`]
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<SegmentationResult> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| SegmentationError::file_io_error("read image file", path, &e))?;
        self.process_bytes(&data).map_err(|e| match e {
            SegmentationError::Decode(msg) => {
                SegmentationError::decode(format!("{msg} (path: {})", path.display()))
            },
            other => other,
        })
    }

    /// Read an async stream to the end and process it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcutout::{SegmentationConfig, SegmentationPipeline};
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let pipeline = SegmentationPipeline::new(SegmentationConfig::default())?;
    /// let file = File::open("product.png").await?;
    /// let result = pipeline.process_reader(file).await?;
    /// result.save_cutout("product_cutout.png")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// - Stream read failures
    /// - Any failure reported by [`SegmentationPipeline::process_bytes`]
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &self,
        mut reader: R,
    ) -> Result<SegmentationResult> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        self.process_bytes(&buffer)
    }

    fn run(
        &self,
        image: &PixelBuffer,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<SegmentationResult> {
        let (width, height) = image.dimensions();
        let output = self.segment_timed(image, &mut timings)?;

        let (cutout_png, mask_png) = {
            let _span = span!(Level::DEBUG, "encode").entered();
            let encode_start = Instant::now();
            let cutout_png = OutputFormatHandler::encode_png(output.cutout.buffer())?;
            let mask_png = OutputFormatHandler::encode_mask_png(&output.mask)?;
            timings.encode_ms = encode_start.elapsed().as_millis() as u64;
            (cutout_png, mask_png)
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        debug!("{}", timings.summary());
        tracing::info!(
            width,
            height,
            bbox = %output.bounding_box,
            total_ms = timings.total_ms,
            "Segmentation complete"
        );

        Ok(SegmentationResult {
            cutout_png,
            mask_png,
            bounding_box: output.bounding_box,
            source_width: width,
            source_height: height,
            timings,
        })
    }

    fn segment_timed(
        &self,
        image: &PixelBuffer,
        timings: &mut ProcessingTimings,
    ) -> Result<SegmentationOutput> {
        let scores = {
            let _span = span!(Level::INFO, "scoring", scorer = %self.scorer.name()).entered();
            let scoring_start = Instant::now();
            let scores = self.scorer.score(image)?;
            timings.scoring_ms = scoring_start.elapsed().as_millis() as u64;
            scores
        };

        if scores.dimensions() != image.dimensions() {
            return Err(SegmentationError::model(format!(
                "Scorer '{}' returned {}x{} scores for a {}x{} image",
                self.scorer.name(),
                scores.width(),
                scores.height(),
                image.width(),
                image.height()
            )));
        }

        let _span = span!(Level::DEBUG, "postprocessing").entered();
        let post_start = Instant::now();

        let mask = MaskBinarizer::binarize(&scores, self.config.mask_threshold);
        let bounding_box = BoundingBoxExtractor::extract(&mask);
        let cutout = Compositor::composite(image, &mask);

        timings.postprocessing_ms = post_start.elapsed().as_millis() as u64;

        Ok(SegmentationOutput {
            mask,
            bounding_box,
            cutout,
        })
    }
}

impl std::fmt::Debug for SegmentationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationPipeline")
            .field("config", &self.config)
            .field("scorer", &self.scorer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backends::{test_utils::MockSegmentationModel, ModelScorer},
        config::ModelConfig,
        types::{BoundingBox, ChannelLayout, ScoreMap},
    };

    fn white_with_black_square() -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                let inside = (1..3).contains(&x) && (1..3).contains(&y);
                let v = if inside { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(data, 4, 4, ChannelLayout::Rgba).unwrap()
    }

    struct WrongSizeScorer;

    impl ForegroundScorer for WrongSizeScorer {
        fn name(&self) -> &str {
            "wrong-size"
        }

        fn score(&self, _image: &PixelBuffer) -> Result<ScoreMap> {
            ScoreMap::filled(1, 1, 1.0)
        }
    }

    struct FixedFactory;

    impl ScorerFactory for FixedFactory {
        fn create_scorer(&self, _config: &SegmentationConfig) -> Result<Arc<dyn ForegroundScorer>> {
            Ok(Arc::new(ModelScorer::from_model(MockSegmentationModel::dark_pixels())))
        }

        fn available_scorers(&self) -> Vec<ScorerKind> {
            vec![ScorerKind::Model]
        }
    }

    #[test]
    fn test_default_pipeline_segments_dark_square() {
        let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();
        let output = pipeline.segment(&white_with_black_square()).unwrap();

        assert_eq!(output.bounding_box, BoundingBox::new(1, 1, 2, 2));
        assert_eq!(output.mask.statistics().foreground_pixels, 4);
        assert_eq!(pipeline.scorer_name(), "heuristic");
    }

    #[test]
    fn test_process_buffer_fills_result() {
        let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();
        let result = pipeline.process_buffer(&white_with_black_square()).unwrap();

        assert_eq!(result.source_dimensions(), (4, 4));
        assert_eq!(result.bounding_box, BoundingBox::new(1, 1, 2, 2));
        assert!(result.cutout_png.starts_with(b"\x89PNG"));
        assert!(result.mask_png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_process_bytes_rejects_garbage() {
        let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();
        assert!(matches!(
            pipeline.process_bytes(b"definitely not an image"),
            Err(SegmentationError::Decode(_))
        ));
    }

    #[test]
    fn test_custom_factory() {
        let config = SegmentationConfig::builder()
            .model(ModelConfig::new("unused.onnx"))
            .build()
            .unwrap();
        let pipeline = SegmentationPipeline::with_factory(config, &FixedFactory).unwrap();
        let output = pipeline.segment(&white_with_black_square()).unwrap();

        assert_eq!(pipeline.scorer_name(), "model");
        assert_eq!(output.bounding_box, BoundingBox::new(1, 1, 2, 2));
    }

    #[test]
    fn test_scorer_dimension_mismatch_is_model_error() {
        let pipeline =
            SegmentationPipeline::with_scorer(SegmentationConfig::default(), Arc::new(WrongSizeScorer))
                .unwrap();
        let err = pipeline.segment(&white_with_black_square()).unwrap_err();
        assert!(matches!(err, SegmentationError::Model(_)));
    }

    #[test]
    fn test_with_scorer_validates_threshold() {
        let config = SegmentationConfig {
            mask_threshold: 1.0,
            ..SegmentationConfig::default()
        };
        assert!(SegmentationPipeline::with_scorer(config, Arc::new(HeuristicScorer::default())).is_err());
    }

    #[test]
    fn test_model_failure_propagates() {
        let scorer = Arc::new(ModelScorer::from_model(MockSegmentationModel::no_mask()));
        let pipeline = SegmentationPipeline::with_scorer(SegmentationConfig::default(), scorer).unwrap();
        assert!(matches!(
            pipeline.process_buffer(&white_with_black_square()),
            Err(SegmentationError::Model(_))
        ));
    }

    #[test]
    fn test_default_factory_lists_heuristic() {
        assert!(DefaultScorerFactory
            .available_scorers()
            .contains(&ScorerKind::Heuristic));
    }

    #[cfg(feature = "tract")]
    #[test]
    fn test_model_scorer_loads_lazily() {
        let config = SegmentationConfig::builder()
            .model(ModelConfig::new("/missing/model.onnx"))
            .build()
            .unwrap();

        // Construction succeeds; the missing file only surfaces per request
        let pipeline = SegmentationPipeline::new(config).unwrap();
        let err = pipeline.segment(&white_with_black_square()).unwrap_err();
        assert!(matches!(err, SegmentationError::Model(_)));
        assert!(err.to_string().contains("model.onnx"));
    }

    #[tokio::test]
    async fn test_process_reader() {
        let pipeline = SegmentationPipeline::new(SegmentationConfig::default()).unwrap();
        let png = OutputFormatHandler::encode_png(&white_with_black_square()).unwrap();
        let result = pipeline
            .process_reader(std::io::Cursor::new(png))
            .await
            .unwrap();
        assert_eq!(result.bounding_box, BoundingBox::new(1, 1, 2, 2));
    }
}
