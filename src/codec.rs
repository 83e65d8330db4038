//! Image codec adapter.
//!
//! This module handles decoding uploaded image bytes, normalizing them for
//! CPU-bound inference, and encoding result artifacts as PNG.
//!
//! # Design Decisions
//!
//! - **Guessed format**: uploads carry unreliable content types, so the format
//!   is sniffed from the byte stream rather than trusted from the request.
//!
//! - **RGB8 normalization**: the inference models operate on 8-bit RGB. All
//!   inputs are converted up front so the gateway never sees exotic channel
//!   layouts.
//!
//! - **Input dimension cap**: the service targets a single low-resource CPU
//!   instance. Oversized uploads are downscaled before inference so one large
//!   photo cannot monopolize the worker pool.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::{RestoreError, ValidationError};

/// Default cap on the longest dimension of a normalized input image.
pub const DEFAULT_MAX_INPUT_DIM: u32 = 2048;

/// Decode uploaded bytes into an image.
///
/// The format is guessed from the byte stream; PNG and JPEG are supported.
///
/// # Errors
///
/// - [`ValidationError::EmptyUpload`] if `data` is empty
/// - [`ValidationError::UnsupportedFormat`] if the container is not recognized
/// - [`ValidationError::Decode`] if the pixel data is malformed
pub fn decode(data: &[u8]) -> Result<DynamicImage, ValidationError> {
    if data.is_empty() {
        return Err(ValidationError::EmptyUpload);
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ValidationError::Decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(ValidationError::UnsupportedFormat {
            reason: "byte stream is not a recognized raster image".to_string(),
        });
    }

    reader
        .decode()
        .map_err(|e| ValidationError::Decode(e.to_string()))
}

/// Normalize a decoded image for inference.
///
/// Converts to RGB8 and downscales so the longest dimension does not exceed
/// `max_dim`. Images already within bounds are only converted, never resized.
pub fn normalize(image: DynamicImage, max_dim: u32) -> DynamicImage {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    if rgb.width().max(rgb.height()) <= max_dim {
        rgb
    } else {
        rgb.resize(max_dim, max_dim, FilterType::Lanczos3)
    }
}

/// Encode an image as PNG.
///
/// PNG is lossless, so re-encoding a cached artifact is byte-stable.
pub fn encode_png(image: &DynamicImage) -> Result<Bytes, RestoreError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| RestoreError::Encode(e.to_string()))?;
    Ok(Bytes::from(buf.into_inner()))
}
