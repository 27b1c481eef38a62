//! Foreground scoring abstractions
//!
//! Two seams live here. [`ForegroundScorer`] is what the pipeline calls to
//! turn pixels into a [`ScoreMap`]. [`SegmentationModel`] is the opaque
//! external collaborator that the model-backed scorer adapts.

use crate::{error::Result, types::PixelBuffer, types::ScoreMap};
use ndarray::Array2;

/// Produces a per-pixel foreground likelihood for a decoded image
///
/// Implementations take `&self` and must be shareable across request
/// threads.
pub trait ForegroundScorer: Send + Sync {
    /// Short name used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Score every pixel of `image`
    ///
    /// The returned map has the same dimensions as the image.
    ///
    /// # Errors
    /// - Collaborator unavailable or failing (model scorers)
    fn score(&self, image: &PixelBuffer) -> Result<ScoreMap>;
}

/// External segmentation model
///
/// Receives an RGB buffer and returns a `(height, width)` array of
/// foreground probabilities, or `None` when it could not produce a mask for
/// this input.
pub trait SegmentationModel: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Run the model once on an RGB image
    ///
    /// # Errors
    /// - Internal model failures
    fn segment(&self, rgb: &PixelBuffer) -> Result<Option<Array2<f32>>>;
}

impl<T: ForegroundScorer + ?Sized> ForegroundScorer for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&self, image: &PixelBuffer) -> Result<ScoreMap> {
        (**self).score(image)
    }
}

impl<T: SegmentationModel + ?Sized> SegmentationModel for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn segment(&self, rgb: &PixelBuffer) -> Result<Option<Array2<f32>>> {
        (**self).segment(rgb)
    }
}
