//! Output encoding service
//!
//! Lossless PNG encoding for cutouts and masks, plus the base64 transport
//! encoding used to embed them in JSON responses.

use crate::{
    error::{Result, SegmentationError},
    types::{BinaryMask, ChannelLayout, PixelBuffer},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder};

/// Service for encoding pipeline outputs
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode a pixel buffer as PNG (RGB8 or RGBA8 depending on layout)
    ///
    /// # Errors
    /// - PNG encoder failure
    ///
    /// # Examples
    /// ```rust
    /// use bgcutout::{services::OutputFormatHandler, ChannelLayout, PixelBuffer};
    ///
    /// let buffer = PixelBuffer::new(vec![0, 0, 0, 255], 1, 1, ChannelLayout::Rgba)?;
    /// let png = OutputFormatHandler::encode_png(&buffer)?;
    /// assert_eq!(&png[1..4], b"PNG");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
        let color_type = match buffer.layout() {
            ChannelLayout::Rgb => ExtendedColorType::Rgb8,
            ChannelLayout::Rgba => ExtendedColorType::Rgba8,
        };
        Self::write_png(buffer.as_raw(), buffer.width(), buffer.height(), color_type)
    }

    /// Encode a binary mask as an 8-bit grayscale PNG (0 or 255 per pixel)
    ///
    /// # Errors
    /// - PNG encoder failure
    pub fn encode_mask_png(mask: &BinaryMask) -> Result<Vec<u8>> {
        Self::write_png(
            mask.as_raw(),
            mask.width(),
            mask.height(),
            ExtendedColorType::L8,
        )
    }

    /// Base64 (standard alphabet, padded) for embedding bytes in text
    #[must_use]
    pub fn to_text(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    /// Reverse of [`OutputFormatHandler::to_text`]
    ///
    /// # Errors
    /// - Input is not valid padded base64
    pub fn from_text(text: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(text)
            .map_err(|e| SegmentationError::decode(format!("Invalid base64 payload: {e}")))
    }

    fn write_png(
        samples: &[u8],
        width: u32,
        height: u32,
        color_type: ExtendedColorType,
    ) -> Result<Vec<u8>> {
        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(samples, width, height, color_type)
            .map_err(|e| {
                SegmentationError::encode(format!(
                    "Failed to encode {width}x{height} {color_type:?} PNG: {e}"
                ))
            })?;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ImageIOService;

    #[test]
    fn test_encode_png_round_trip_rgba() {
        let data: Vec<u8> = (0..4 * 3 * 2).map(|v| (v * 10) as u8).collect();
        let buffer = PixelBuffer::new(data.clone(), 3, 2, ChannelLayout::Rgba).unwrap();

        let png = OutputFormatHandler::encode_png(&buffer).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.into_raw(), data);
    }

    #[test]
    fn test_encode_png_rgb_layout() {
        let buffer = PixelBuffer::new(vec![1, 2, 3, 4, 5, 6], 2, 1, ChannelLayout::Rgb).unwrap();
        let png = OutputFormatHandler::encode_png(&buffer).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_encode_mask_png_is_grayscale() {
        let mask = BinaryMask::from_bools(&[true, false, false, true], (2, 2)).unwrap();
        let png = OutputFormatHandler::encode_mask_png(&mask).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();

        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.to_luma8().into_raw(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_text_encoding_round_trip() {
        let bytes = [0_u8, 1, 2, 250, 251, 255];
        let text = OutputFormatHandler::to_text(&bytes);
        assert_eq!(text, "AAEC+vv/");
        assert_eq!(OutputFormatHandler::from_text(&text).unwrap(), bytes);
    }

    #[test]
    fn test_text_encoding_is_padded() {
        assert_eq!(OutputFormatHandler::to_text(b"ab"), "YWI=");
        assert!(OutputFormatHandler::from_text("not base64!").is_err());
    }

    #[test]
    fn test_encoded_png_decodes_through_input_service() {
        let buffer = PixelBuffer::new(vec![7; 4 * 4 * 4], 4, 4, ChannelLayout::Rgba).unwrap();
        let png = OutputFormatHandler::encode_png(&buffer).unwrap();
        let back = ImageIOService::decode(&png).unwrap();
        assert_eq!(back, buffer);
    }
}
