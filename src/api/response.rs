//! JSON envelopes returned to API clients

use crate::{
    error::{Result, SegmentationError},
    services::OutputFormatHandler,
    types::{BoundingBox, SegmentationResult},
};
use serde::{Deserialize, Serialize};

/// Successful segmentation response
///
/// `mask` and `foreground` are base64-encoded PNGs. `bbox` is
/// `[x, y, width, height]` in source pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationResponse {
    pub mask: String,
    pub foreground: String,
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
}

impl SegmentationResponse {
    /// Decode the embedded cutout PNG
    ///
    /// # Errors
    /// - Invalid base64
    pub fn foreground_png(&self) -> Result<Vec<u8>> {
        OutputFormatHandler::from_text(&self.foreground)
    }

    /// Decode the embedded mask PNG
    ///
    /// # Errors
    /// - Invalid base64
    pub fn mask_png(&self) -> Result<Vec<u8>> {
        OutputFormatHandler::from_text(&self.mask)
    }
}

impl From<&SegmentationResult> for SegmentationResponse {
    fn from(result: &SegmentationResult) -> Self {
        Self {
            mask: OutputFormatHandler::to_text(&result.mask_png),
            foreground: OutputFormatHandler::to_text(&result.cutout_png),
            bbox: result.bounding_box,
            width: result.source_width,
            height: result.source_height,
        }
    }
}

/// In-band error object: `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl From<&SegmentationError> for ErrorResponse {
    fn from(err: &SegmentationError) -> Self {
        Self::new(err.to_string())
    }
}
