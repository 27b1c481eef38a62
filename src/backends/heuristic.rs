//! Luminance threshold scorer
//!
//! Treats anything noticeably darker than a near-white backdrop as
//! foreground. Needs no model and is fully deterministic, which makes it the
//! default scorer and the reference for pipeline tests.

use crate::{
    config::DEFAULT_LUMINANCE_THRESHOLD,
    error::Result,
    inference::ForegroundScorer,
    types::{PixelBuffer, ScoreMap},
};
use ndarray::Array2;

/// Scores a pixel 1.0 when the mean of its R, G and B samples is below the
/// threshold, 0.0 otherwise. Alpha is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicScorer {
    threshold: u8,
}

impl HeuristicScorer {
    #[must_use]
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Integer form of `(r + g + b) / 3 < threshold`
    #[inline]
    fn is_foreground(&self, px: &[u8]) -> bool {
        let sum: u32 = px.iter().take(3).map(|&v| u32::from(v)).sum();
        sum < 3 * u32::from(self.threshold)
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(DEFAULT_LUMINANCE_THRESHOLD)
    }
}

impl ForegroundScorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn score(&self, image: &PixelBuffer) -> Result<ScoreMap> {
        let (width, height) = image.dimensions();
        let scores: Vec<f32> = image
            .pixels()
            .map(|px| if self.is_foreground(px) { 1.0 } else { 0.0 })
            .collect();

        let scores = Array2::from_shape_vec((height as usize, width as usize), scores)
            .map_err(|e| crate::error::SegmentationError::model(format!("Score map shape: {e}")))?;

        log::trace!(
            "Heuristic scorer (threshold {}) scored {}x{} image",
            self.threshold,
            width,
            height
        );

        ScoreMap::new(scores)
    }
}
