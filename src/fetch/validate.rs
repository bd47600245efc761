//! Structural image validation.

use image::ImageFormat;

use crate::error::{CurateError, Result};

/// What a successful decode tells us about the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Decode `bytes` fully; anything that does not decode is not an image.
///
/// HTML error pages, truncated transfers and zero-byte bodies all fail here.
pub fn validate_image(bytes: &[u8]) -> Result<ImageInfo> {
    if bytes.is_empty() {
        return Err(CurateError::InvalidImage("empty body".into()));
    }
    let format =
        image::guess_format(bytes).map_err(|e| CurateError::InvalidImage(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CurateError::InvalidImage(e.to_string()))?;
    Ok(ImageInfo {
        format,
        width: decoded.width(),
        height: decoded.height(),
    })
}
