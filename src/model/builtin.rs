//! Built-in CPU model implementations.
//!
//! The production system delegates inference to external pretrained models
//! (a GAN face restorer and a learned colorizer). These reference
//! implementations stand in behind the same [`RestorationModel`] contract so
//! the service runs self-contained on a CPU-only instance: a sharpening
//! restorer and a fixed-palette luminance colorizer. Both are deterministic.

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::ModelError;

use super::gateway::{ModelProvider, RestorationModel};

/// Sharpening amount for the face restorer (unsharp mask sigma).
const SHARPEN_SIGMA: f32 = 1.2;

/// Unsharp mask threshold; differences below this are left untouched.
const SHARPEN_THRESHOLD: i32 = 4;

// =============================================================================
// Face Restorer
// =============================================================================

/// CPU face restorer: unsharp masking to recover edge detail.
#[derive(Debug, Default)]
pub struct SharpenRestorer;

impl RestorationModel for SharpenRestorer {
    fn name(&self) -> &'static str {
        "face_restorer"
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ModelError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ModelError::Inference {
                model: self.name(),
                reason: "input image has zero dimension".to_string(),
            });
        }

        let rgb = image.to_rgb8();
        let sharpened = image::imageops::unsharpen(&rgb, SHARPEN_SIGMA, SHARPEN_THRESHOLD);
        Ok(DynamicImage::ImageRgb8(sharpened))
    }
}

// =============================================================================
// Colorizer
// =============================================================================

/// CPU colorizer: maps luminance through a fixed warm palette.
///
/// The lookup table is built once at load time, standing in for the one-time
/// initialization cost of a real model.
pub struct LumaColorizer {
    lut: Box<[[u8; 3]; 256]>,
}

impl LumaColorizer {
    /// Build the colorizer, computing its luminance palette.
    pub fn new() -> Self {
        let mut lut = Box::new([[0u8; 3]; 256]);
        for (luma, entry) in lut.iter_mut().enumerate() {
            let l = luma as f32;
            // Warm tone: boosted red, neutral green, suppressed blue
            let r = (l * 1.12 + 10.0).min(255.0);
            let g = l;
            let b = (l * 0.82).min(255.0);
            *entry = [r.round() as u8, g.round() as u8, b.round() as u8];
        }
        Self { lut }
    }
}

impl Default for LumaColorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RestorationModel for LumaColorizer {
    fn name(&self) -> &'static str {
        "colorizer"
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ModelError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ModelError::Inference {
                model: self.name(),
                reason: "input image has zero dimension".to_string(),
            });
        }

        let luma = image.to_luma8();
        let mut colored = image::RgbImage::new(luma.width(), luma.height());
        for (x, y, pixel) in luma.enumerate_pixels() {
            let mapped = self.lut[pixel.0[0] as usize];
            colored.put_pixel(x, y, image::Rgb(mapped));
        }
        Ok(DynamicImage::ImageRgb8(colored))
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Provider wiring the built-in CPU models into the gateway.
#[derive(Debug, Default)]
pub struct BuiltinModelProvider;

impl BuiltinModelProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelProvider for BuiltinModelProvider {
    async fn load_face_restorer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Ok(Arc::new(SharpenRestorer))
    }

    async fn load_colorizer(&self) -> Result<Arc<dyn RestorationModel>, ModelError> {
        Ok(Arc::new(LumaColorizer::new()))
    }
}

// =============================================================================
// Tests
// =============================================================================
