//! src/decoder.rs
//!
//! Decoding fetched bytes into a fixed-format pixel array.
//!
//! The decoder assumes non-empty input: the pipeline engine gates absent
//! payloads (failed fetches) before ever calling in here, so a decode error
//! always means the bytes themselves are corrupt or not an image.

use std::io::Cursor;

use image::{ImageError, ImageReader, RgbImage};

/// Decodes an in-memory image buffer into an RGB pixel array.
///
/// The container format (JPEG, PNG, WebP, ...) is sniffed from the bytes;
/// whatever the source color type, the result is 8-bit RGB, height-major,
/// interleaved channels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ImageError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()?;
    Ok(image.to_rgb8())
}
