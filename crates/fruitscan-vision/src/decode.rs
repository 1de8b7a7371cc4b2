//! Decoding of uploaded image bytes.

use std::io::Cursor;

use image::error::ImageError;
use image::io::{Limits, Reader};
use image::DynamicImage;
use tracing::debug;

use crate::error::{VisionError, VisionResult};

/// Upper bounds applied while decoding untrusted uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// Maximum bytes the decoder may allocate.
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 8192,
            max_height: 8192,
            max_alloc: 512 * 1024 * 1024, // 512MB
        }
    }
}

impl DecodeLimits {
    /// Square limit on both dimensions.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_width: max_dimension,
            max_height: max_dimension,
            ..Self::default()
        }
    }

    fn to_image_limits(self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}

/// Decode raw upload bytes into an image.
///
/// The format is sniffed from the content, not from the file name.
pub fn decode_image(bytes: &[u8], limits: &DecodeLimits) -> VisionResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(VisionError::EmptyUpload);
    }

    let mut reader = Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VisionError::invalid_image(e.to_string()))?;

    if reader.format().is_none() {
        return Err(VisionError::invalid_image("Unrecognized image format"));
    }

    reader.limits(limits.to_image_limits());

    let image = reader.decode().map_err(|e| match e {
        ImageError::Limits(e) => VisionError::ImageTooLarge(e.to_string()),
        other => VisionError::invalid_image(other.to_string()),
    })?;

    debug!(
        width = image.width(),
        height = image.height(),
        "Decoded uploaded image"
    );

    Ok(image)
}
