//! Alpha compositing of source pixels with a binary mask

use crate::types::{BinaryMask, ChannelLayout, CutoutImage, PixelBuffer, MASK_FOREGROUND};

/// Builds transparent cutouts
pub struct Compositor;

impl Compositor {
    /// Copy RGB from `image` and take alpha from `mask`
    ///
    /// Foreground pixels get alpha 255 and background pixels alpha 0. Any
    /// alpha in the source is discarded.
    ///
    /// # Panics
    /// When the image and mask dimensions differ. The pipeline always derives
    /// the mask from the same image, so a mismatch is a programming error.
    #[must_use]
    pub fn composite(image: &PixelBuffer, mask: &BinaryMask) -> CutoutImage {
        assert_eq!(
            image.dimensions(),
            mask.dimensions(),
            "mask dimensions must match the image"
        );

        let mut data = Vec::with_capacity(image.pixel_count() * 4);
        for (px, &m) in image.pixels().zip(mask.as_raw()) {
            data.extend(px.iter().take(3));
            data.push(if m == MASK_FOREGROUND { 255 } else { 0 });
        }

        let (width, height) = image.dimensions();
        CutoutImage::from_trusted(PixelBuffer::from_trusted(
            data,
            width,
            height,
            ChannelLayout::Rgba,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_follows_mask_rgb_preserved() {
        let image = PixelBuffer::new(
            vec![10, 20, 30, 128, 40, 50, 60, 7],
            2,
            1,
            ChannelLayout::Rgba,
        )
        .unwrap();
        let mask = BinaryMask::from_bools(&[true, false], (2, 1)).unwrap();

        let cutout = Compositor::composite(&image, &mask);
        assert_eq!(cutout.buffer().as_raw(), &[10, 20, 30, 255, 40, 50, 60, 0]);
    }

    #[test]
    fn test_rgb_source_gains_alpha() {
        let image = PixelBuffer::new(vec![1, 2, 3, 4, 5, 6], 1, 2, ChannelLayout::Rgb).unwrap();
        let mask = BinaryMask::from_bools(&[false, true], (1, 2)).unwrap();

        let cutout = Compositor::composite(&image, &mask);
        assert_eq!(cutout.buffer().layout(), ChannelLayout::Rgba);
        assert_eq!(cutout.alpha().collect::<Vec<_>>(), vec![0, 255]);
        assert_eq!(cutout.buffer().pixel(0, 1), Some(&[4, 5, 6, 255][..]));
    }

    #[test]
    fn test_alpha_is_binary() {
        let data: Vec<u8> = (0..8 * 8 * 4).map(|i| (i % 251) as u8).collect();
        let image = PixelBuffer::new(data, 8, 8, ChannelLayout::Rgba).unwrap();
        let mask = BinaryMask::from_fn(8, 8, |x, y| (x + y) % 3 == 0).unwrap();

        let cutout = Compositor::composite(&image, &mask);
        assert!(cutout.alpha().all(|a| a == 0 || a == 255));
        assert!(CutoutImage::new(cutout.into_buffer()).is_ok());
    }

    #[test]
    #[should_panic(expected = "mask dimensions must match the image")]
    fn test_dimension_mismatch_panics() {
        let image = PixelBuffer::new(vec![0; 4 * 4], 2, 2, ChannelLayout::Rgba).unwrap();
        let mask = BinaryMask::from_bools(&[true; 6], (3, 2)).unwrap();
        let _ = Compositor::composite(&image, &mask);
    }
}
