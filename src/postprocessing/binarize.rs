//! Score map thresholding

use crate::types::{BinaryMask, ScoreMap, MASK_BACKGROUND, MASK_FOREGROUND};

/// Turns a score map into a binary mask
pub struct MaskBinarizer;

impl MaskBinarizer {
    /// Mark every pixel whose score is strictly greater than `threshold`
    ///
    /// The output has the same dimensions as `scores`. A threshold of 0.5
    /// maps a score of exactly 0.5 to background.
    #[must_use]
    pub fn binarize(scores: &ScoreMap, threshold: f32) -> BinaryMask {
        let data: Vec<u8> = scores
            .iter()
            .map(|score| {
                if score > threshold {
                    MASK_FOREGROUND
                } else {
                    MASK_BACKGROUND
                }
            })
            .collect();

        // ScoreMap is non-empty and row-major, so the mask invariants hold
        BinaryMask::from_trusted(data, scores.dimensions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn scores(values: &[f32], width: usize, height: usize) -> ScoreMap {
        ScoreMap::new(Array2::from_shape_vec((height, width), values.to_vec()).unwrap()).unwrap()
    }

    #[test]
    fn test_strict_threshold() {
        let map = scores(&[0.0, 0.49, 0.5, 0.51, 1.0, 0.75], 3, 2);
        let mask = MaskBinarizer::binarize(&map, 0.5);
        assert_eq!(mask.as_raw(), &[0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_dimensions_preserved() {
        let map = ScoreMap::filled(7, 3, 0.9).unwrap();
        let mask = MaskBinarizer::binarize(&map, 0.5);
        assert_eq!(mask.dimensions(), (7, 3));
        assert!(mask.is_foreground(6, 2));
    }

    #[test]
    fn test_raster_order_matches_coordinates() {
        // Only (x=2, y=0) is foreground
        let map = scores(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.0], 3, 2);
        let mask = MaskBinarizer::binarize(&map, 0.5);
        assert!(mask.is_foreground(2, 0));
        assert!(!mask.is_foreground(0, 1));
    }

    #[test]
    fn test_zero_threshold_keeps_any_positive_score() {
        let map = scores(&[0.0, 0.001], 2, 1);
        let mask = MaskBinarizer::binarize(&map, 0.0);
        assert_eq!(mask.as_raw(), &[0, 255]);
    }

    #[test]
    fn test_all_ones_always_foreground_below_one() {
        let map = ScoreMap::filled(2, 2, 1.0).unwrap();
        let mask = MaskBinarizer::binarize(&map, 0.999);
        assert_eq!(mask.statistics().foreground_pixels, 4);
    }
}
