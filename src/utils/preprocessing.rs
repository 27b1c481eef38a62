//! Tensor preparation and score resampling for model collaborators
//!
//! Models run at a fixed input size. These helpers scale the source image to
//! that size, normalise it into the tensor layout the network expects, and
//! bring the model's output back to source resolution.

use crate::{
    config::{ModelConfig, TensorLayout},
    error::{Result, SegmentationError},
    types::PixelBuffer,
};
use image::{imageops::FilterType, ImageBuffer, Luma};
use ndarray::{Array2, Array4};

/// Builds normalised input tensors for segmentation models
pub struct ModelInputBuilder;

impl ModelInputBuilder {
    /// Resize `image` to the model input size and convert it to a normalised tensor
    ///
    /// Samples are scaled to [0, 1] and then normalised per channel with
    /// `(v - mean) / std`. The tensor shape is `[1, 3, H, W]` for NCHW and
    /// `[1, H, W, 3]` for NHWC. Alpha is discarded.
    ///
    /// # Errors
    /// - Internal inconsistency in the source buffer
    pub fn build_tensor(image: &PixelBuffer, config: &ModelConfig) -> Result<Array4<f32>> {
        let (target_width, target_height) = config.input_size;
        let rgb = image.to_rgb().to_dynamic_image()?.to_rgb8();

        let resized = if rgb.dimensions() == (target_width, target_height) {
            rgb
        } else {
            image::imageops::resize(&rgb, target_width, target_height, FilterType::Triangle)
        };

        let (w, h) = (target_width as usize, target_height as usize);
        let mut tensor = match config.layout {
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, h, w)),
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, h, w, 3)),
        };

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match the resized image
        for (y, row) in resized.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                for c in 0..3 {
                    let value = (f32::from(pixel[c]) / 255.0 - config.normalization_mean[c])
                        / config.normalization_std[c];
                    match config.layout {
                        TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                        TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                    }
                }
            }
        }

        Ok(tensor)
    }
}

/// Resample a `(height, width)` score array to new dimensions
///
/// Uses the triangle (bilinear) filter. Output values stay within the range
/// of [0, 1] since that is the nominal range of `f32` luma samples.
///
/// # Errors
/// - Empty input array
/// - Zero target dimension
pub fn resize_scores(scores: &Array2<f32>, width: u32, height: u32) -> Result<Array2<f32>> {
    let (rows, cols) = scores.dim();
    if rows == 0 || cols == 0 || width == 0 || height == 0 {
        return Err(SegmentationError::model(format!(
            "Cannot resize {cols}x{rows} scores to {width}x{height}"
        )));
    }

    if (cols, rows) == (width as usize, height as usize) {
        return Ok(scores.clone());
    }

    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(cols as u32, rows as u32, scores.iter().copied().collect())
            .ok_or_else(|| SegmentationError::model("Score array does not match its shape"))?;

    let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);

    Array2::from_shape_vec((height as usize, width as usize), resized.into_raw())
        .map_err(|e| SegmentationError::model(format!("Failed to reshape resized scores: {e}")))
}

/// Logistic function applied element-wise
#[must_use]
pub fn sigmoid(scores: Array2<f32>) -> Array2<f32> {
    scores.mapv_into(|v| 1.0 / (1.0 + (-v).exp()))
}
