//! Core types for segmentation operations

use crate::error::{Result, SegmentationError};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Channel layout of a [`PixelBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    /// 3 bytes per pixel
    Rgb,
    /// 4 bytes per pixel, alpha last
    Rgba,
}

impl ChannelLayout {
    /// Number of samples per pixel
    #[must_use]
    pub fn channel_count(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Interleaved 8-bit raster with known dimensions and channel layout
///
/// `data.len() == width * height * layout.channel_count()` always holds and
/// both dimensions are non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    layout: ChannelLayout,
}

impl PixelBuffer {
    /// Create a buffer from raw interleaved samples
    ///
    /// # Errors
    /// - Zero width or height
    /// - Sample count that does not match the dimensions and layout
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: ChannelLayout) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SegmentationError::decode(format!(
                "Image has zero dimension ({width}x{height})"
            )));
        }

        let expected = width as usize * height as usize * layout.channel_count();
        if data.len() != expected {
            return Err(SegmentationError::decode(format!(
                "Pixel data length {} does not match {}x{} {:?} (expected {})",
                data.len(),
                width,
                height,
                layout,
                expected
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            layout,
        })
    }

    /// Wrap samples produced from an existing valid buffer of the same size
    pub(crate) fn from_trusted(data: Vec<u8>, width: u32, height: u32, layout: ChannelLayout) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * layout.channel_count()
        );
        Self {
            data,
            width,
            height,
            layout,
        }
    }

    /// Wrap an RGBA image buffer
    ///
    /// # Errors
    /// - Zero width or height
    pub fn from_rgba_image(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, ChannelLayout::Rgba)
    }

    /// Wrap an RGB image buffer
    ///
    /// # Errors
    /// - Zero width or height
    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, ChannelLayout::Rgb)
    }

    /// Convert a decoded image, adding an opaque alpha channel when absent
    ///
    /// # Errors
    /// - Zero width or height
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::from_rgba_image(image.to_rgba8())
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Raw interleaved samples
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Iterate over pixels in raster order, each as a slice of channel samples
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.layout.channel_count())
    }

    /// Samples of the pixel at (x, y), or `None` when out of bounds
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.layout.channel_count();
        let start = (y as usize * self.width as usize + x as usize) * channels;
        self.data.get(start..start + channels)
    }

    /// Copy into an RGB buffer, dropping alpha
    #[must_use]
    pub fn to_rgb(&self) -> PixelBuffer {
        match self.layout {
            ChannelLayout::Rgb => self.clone(),
            ChannelLayout::Rgba => {
                let data = self
                    .pixels()
                    .flat_map(|px| px.iter().take(3).copied())
                    .collect();
                PixelBuffer {
                    data,
                    width: self.width,
                    height: self.height,
                    layout: ChannelLayout::Rgb,
                }
            },
        }
    }

    /// Convert into an `image` crate buffer
    ///
    /// # Errors
    /// - Internal inconsistency between data and dimensions
    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let inconsistent =
            || SegmentationError::encode("Pixel buffer data does not match its dimensions");
        match self.layout {
            ChannelLayout::Rgb => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(inconsistent),
            ChannelLayout::Rgba => RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(inconsistent),
        }
    }
}

/// Per-pixel foreground likelihood in [0, 1], shape `(height, width)`
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMap {
    scores: Array2<f32>,
}

impl ScoreMap {
    /// Wrap a score array
    ///
    /// # Errors
    /// - Empty array
    /// - Any value that is not finite or lies outside [0, 1]
    pub fn new(scores: Array2<f32>) -> Result<Self> {
        if scores.is_empty() {
            return Err(SegmentationError::model("Score map is empty"));
        }
        if let Some(bad) = scores
            .iter()
            .find(|v| !v.is_finite() || !(0.0..=1.0).contains(*v))
        {
            return Err(SegmentationError::model(format!(
                "Score map contains value {bad} outside [0, 1]"
            )));
        }
        Ok(Self { scores })
    }

    /// Score map filled with one value
    ///
    /// # Errors
    /// - Zero dimension or value outside [0, 1]
    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self> {
        Self::new(Array2::from_elem((height as usize, width as usize), value))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.scores.ncols() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.scores.nrows() as u32
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Score at (x, y)
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.scores.get((y as usize, x as usize)).copied()
    }

    /// Underlying array, indexed `[row, column]`
    #[must_use]
    pub fn as_array(&self) -> &Array2<f32> {
        &self.scores
    }

    /// Scores in raster order
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.scores.iter().copied()
    }
}

/// Value stored for foreground pixels in a [`BinaryMask`]
pub const MASK_FOREGROUND: u8 = 255;

/// Value stored for background pixels in a [`BinaryMask`]
pub const MASK_BACKGROUND: u8 = 0;

/// Binary segmentation mask, one byte per pixel, each exactly 0 or 255
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct BinaryMask {
    data: Vec<u8>,
    dimensions: (u32, u32),
}

/// Unchecked serialized form of a [`BinaryMask`]
#[derive(Deserialize)]
struct RawMask {
    data: Vec<u8>,
    dimensions: (u32, u32),
}

impl TryFrom<RawMask> for BinaryMask {
    type Error = SegmentationError;

    fn try_from(raw: RawMask) -> Result<Self> {
        Self::new(raw.data, raw.dimensions)
    }
}

impl BinaryMask {
    /// Create a mask from 0/255 bytes
    ///
    /// # Errors
    /// - Zero dimension or mismatched length
    /// - Any byte other than 0 or 255
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        if width == 0 || height == 0 {
            return Err(SegmentationError::invalid_config(format!(
                "Mask has zero dimension ({width}x{height})"
            )));
        }
        if data.len() != width as usize * height as usize {
            return Err(SegmentationError::invalid_config(format!(
                "Mask data length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        if data
            .iter()
            .any(|&v| v != MASK_FOREGROUND && v != MASK_BACKGROUND)
        {
            return Err(SegmentationError::invalid_config(
                "Mask values must be 0 or 255",
            ));
        }
        Ok(Self { data, dimensions })
    }

    /// Create a mask from booleans in raster order
    ///
    /// # Errors
    /// - Zero dimension or mismatched length
    pub fn from_bools(values: &[bool], dimensions: (u32, u32)) -> Result<Self> {
        let data = values
            .iter()
            .map(|&fg| if fg { MASK_FOREGROUND } else { MASK_BACKGROUND })
            .collect();
        Self::new(data, dimensions)
    }

    /// Build a mask by evaluating a predicate for every pixel
    ///
    /// # Errors
    /// - Zero dimension
    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(if is_foreground(x, y) {
                    MASK_FOREGROUND
                } else {
                    MASK_BACKGROUND
                });
            }
        }
        Self::new(data, (width, height))
    }

    /// Wrap bytes the caller has already produced as 0/255 with a matching length
    pub(crate) fn from_trusted(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        debug_assert_eq!(data.len(), dimensions.0 as usize * dimensions.1 as usize);
        Self { data, dimensions }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Raw 0/255 bytes in raster order
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Whether (x, y) is foreground; out-of-bounds is background
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        if x >= self.width() || y >= self.height() {
            return false;
        }
        let idx = y as usize * self.width() as usize + x as usize;
        self.data.get(idx).is_some_and(|&v| v == MASK_FOREGROUND)
    }

    /// Whether any pixel is foreground
    #[must_use]
    pub fn has_foreground(&self) -> bool {
        self.data.iter().any(|&v| v == MASK_FOREGROUND)
    }

    /// Convert to a grayscale image
    ///
    /// # Errors
    /// - Internal inconsistency between data and dimensions
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| SegmentationError::encode("Failed to create image from mask data"))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x == MASK_FOREGROUND).count();
        let background_pixels = total_pixels - foreground_pixels;

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: foreground_pixels as f32 / total_pixels as f32,
            background_ratio: background_pixels as f32 / total_pixels as f32,
        }
    }
}

/// Statistics about a binary mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Axis-aligned rectangle in pixel coordinates
///
/// Serializes as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image; used when no subject is found
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Whether the box lies inside an image of the given size
    #[must_use]
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(image_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(image_height)
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    #[must_use]
    pub fn to_array(self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// RGBA image whose alpha channel is a binary mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutoutImage {
    buffer: PixelBuffer,
}

impl CutoutImage {
    /// Wrap an RGBA buffer whose alpha samples are all 0 or 255
    ///
    /// # Errors
    /// - Non-RGBA layout
    /// - Any alpha sample other than 0 or 255
    pub fn new(buffer: PixelBuffer) -> Result<Self> {
        if buffer.layout() != ChannelLayout::Rgba {
            return Err(SegmentationError::invalid_config(
                "Cutout image must be RGBA",
            ));
        }
        if buffer.pixels().any(|px| !matches!(px.get(3), Some(0 | 255))) {
            return Err(SegmentationError::invalid_config(
                "Cutout alpha must be 0 or 255",
            ));
        }
        Ok(Self { buffer })
    }

    /// Wrap an RGBA buffer whose alpha the caller wrote as 0 or 255
    pub(crate) fn from_trusted(buffer: PixelBuffer) -> Self {
        debug_assert_eq!(buffer.layout(), ChannelLayout::Rgba);
        Self { buffer }
    }

    /// Underlying RGBA buffer
    #[must_use]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Alpha samples in raster order
    pub fn alpha(&self) -> impl Iterator<Item = u8> + '_ {
        self.buffer.pixels().filter_map(|px| px.get(3).copied())
    }
}

/// Unencoded pipeline output
#[derive(Debug, Clone)]
pub struct SegmentationOutput {
    /// Binary foreground mask
    pub mask: BinaryMask,
    /// Bounding box of the largest external foreground region
    pub bounding_box: BoundingBox,
    /// Transparent cutout
    pub cutout: CutoutImage,
}

/// Complete result of one segmentation request
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Cutout encoded as RGBA PNG
    pub cutout_png: Vec<u8>,
    /// Mask encoded as 8-bit grayscale PNG
    pub mask_png: Vec<u8>,
    /// Subject bounding box
    pub bounding_box: BoundingBox,
    /// Source image width
    pub source_width: u32,
    /// Source image height
    pub source_height: u32,
    /// Stage timings
    pub timings: ProcessingTimings,
}

impl SegmentationResult {
    /// Save the cutout PNG
    ///
    /// # Errors
    /// - File write failures
    pub fn save_cutout<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.cutout_png)
            .map_err(|e| SegmentationError::file_io_error("write cutout", path, &e))
    }

    /// Save the mask PNG
    ///
    /// # Errors
    /// - File write failures
    pub fn save_mask<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.mask_png)
            .map_err(|e| SegmentationError::file_io_error("write mask", path, &e))
    }

    /// Source dimensions as (width, height)
    #[must_use]
    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }
}

/// Timing breakdown for one pipeline run, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Decoding the input bytes
    pub decode_ms: u64,

    /// Foreground scoring (heuristic or model)
    pub scoring_ms: u64,

    /// Binarization, bounding box extraction and compositing
    pub postprocessing_ms: u64,

    /// PNG encoding of cutout and mask
    pub encode_ms: u64,

    /// Total end-to-end time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Fraction of the total spent in scoring
    #[must_use]
    pub fn scoring_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.scoring_ms as f64 / self.total_ms as f64
        }
    }

    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.decode_ms + self.scoring_ms + self.postprocessing_ms + self.encode_ms;
        self.total_ms.saturating_sub(measured)
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Decode: {}ms | Scoring: {}ms | Postprocess: {}ms | Encode: {}ms",
            self.total_ms, self.decode_ms, self.scoring_ms, self.postprocessing_ms, self.encode_ms
        )
    }
}
