//! Base64 frame payloads to RGB pixel buffers.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;

/// Decode base64 text, ignoring line wraps and other ASCII whitespace.
/// Padding must be canonical: `aGVsbG8` is rejected, `aGVsbG8=` is not.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .context("invalid base64 image data")
}

/// Decode a base64-encoded image (any format `image` recognises) into RGB.
pub fn decode_image(data: &str) -> Result<RgbImage> {
    let bytes = decode_base64(data)?;
    let image = image::load_from_memory(&bytes).context("failed to decode image")?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
pub(crate) fn png_base64(image: &RgbImage) -> String {
    use image::ImageFormat;
    use std::io::Cursor;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(&bytes)
}
