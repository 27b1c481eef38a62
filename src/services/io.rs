//! Image decoding service
//!
//! Turns encoded bytes, files or async streams into a [`PixelBuffer`]. This
//! keeps all format detection and I/O away from the scoring and
//! postprocessing stages.

use crate::{
    error::{Result, SegmentationError},
    types::PixelBuffer,
};
use std::path::Path;

/// Service for decoding input images
pub struct ImageIOService;

impl ImageIOService {
    /// Decode encoded image bytes into an RGBA pixel buffer
    ///
    /// The format is detected from the content. Images without an alpha
    /// channel get an opaque one.
    ///
    /// # Errors
    /// - Empty input
    /// - Bytes that are not a supported image format
    /// - Decoded image with zero width or height
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcutout::services::ImageIOService;
    ///
    /// let bytes = std::fs::read("portrait.jpg")?;
    /// let buffer = ImageIOService::decode(&bytes)?;
    /// assert!(buffer.width() > 0);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
        if bytes.is_empty() {
            return Err(SegmentationError::decode("Empty image data"));
        }

        let image = image::load_from_memory(bytes).map_err(|e| {
            SegmentationError::decode_with_input(
                &format!("Failed to decode image from bytes: {e}"),
                bytes.len(),
            )
        })?;

        log::debug!(
            "Decoded {}x{} image ({:?}) from {} bytes",
            image.width(),
            image.height(),
            image.color(),
            bytes.len()
        );

        PixelBuffer::from_dynamic(&image)
    }

    /// Load and decode an image file
    ///
    /// Content-based detection is used, so the extension does not need to
    /// match the actual format.
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Any failure reported by [`ImageIOService::decode`]
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(SegmentationError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let data = std::fs::read(path_ref)
            .map_err(|e| SegmentationError::file_io_error("read image data", path_ref, &e))?;

        Self::decode(&data).map_err(|e| match e {
            SegmentationError::Decode(msg) => {
                SegmentationError::decode(format!("{msg} (path: {})", path_ref.display()))
            },
            other => other,
        })
    }

    /// Read an async stream to the end and decode it
    ///
    /// # Errors
    /// - Stream read failures
    /// - Any failure reported by [`ImageIOService::decode`]
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgcutout::services::ImageIOService;
    /// use tokio::fs::File;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = File::open("portrait.png").await?;
    /// let buffer = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> Result<PixelBuffer> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;

        Self::decode(&buffer)
    }

    /// Check if a file path has a decodable image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext_lower = ext.to_lowercase();
                match ext_lower.as_str() {
                    "jpg" | "jpeg" | "png" | "tiff" | "tif" => true,
                    "webp" => cfg!(feature = "webp-support"),
                    _ => false,
                }
            })
    }
}
