//! In-memory image decoding and encoding.
//!
//! Bytes in, [`Image`] out, and back. No file or network access happens
//! here; callers read and write the bytes themselves.

use image::ExtendedColorType;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use crate::color;
use crate::types::{ColorSpace, Image, PipelineError};

/// Decode raw image bytes into an 8-bit RGB image.
///
/// Supports PNG, JPEG, BMP, and WebP. Alpha is discarded.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<Image, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(Image::from_rgb(img.to_rgb8()))
}

/// Encode an image as PNG.
///
/// Gray images are written as 8-bit grayscale, everything else as 8-bit
/// RGB (HSV and LAB are converted first).
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the PNG encoder fails.
pub fn encode(image: &Image) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    match (image.color_space(), image.as_gray()) {
        (ColorSpace::Gray, Some(gray)) => encoder.write_image(
            gray.as_raw(),
            gray.width(),
            gray.height(),
            ExtendedColorType::L8,
        ),
        _ => {
            let rgb = color::to_rgb(image);
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
        }
    }
    .map_err(PipelineError::ImageEncode)?;
    Ok(buf)
}
