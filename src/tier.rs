//! Watermark and tiering stage.
//!
//! A single inference result is rendered into two artifacts:
//!
//! - **Preview**: downscaled to [`DEFAULT_PREVIEW_MAX_DIM`] with a visible
//!   translucent mark in the bottom-right corner. Served for free.
//! - **HD**: capped at [`DEFAULT_HD_MAX_DIM`], no mark. Served after payment
//!   confirmation.
//!
//! Tiering is deterministic: fixed corner placement, fixed opacity, Lanczos3
//! resampling. The same input image always yields byte-identical artifacts.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Default maximum dimension for the free preview artifact.
pub const DEFAULT_PREVIEW_MAX_DIM: u32 = 600;

/// Default maximum dimension for the HD artifact.
pub const DEFAULT_HD_MAX_DIM: u32 = 1200;

/// Opacity of the preview watermark (0.0 = invisible, 1.0 = solid white).
const WATERMARK_OPACITY: f32 = 0.3;

/// Inset of the watermark from the image edges, in pixels.
const WATERMARK_INSET: u32 = 12;

/// Output tier of a rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Downscaled, watermarked, free
    Preview,
    /// Full quality, unmarked, payment-gated
    Hd,
}

impl Tier {
    /// File/URL suffix for this tier.
    pub fn suffix(&self) -> &'static str {
        match self {
            Tier::Preview => "preview",
            Tier::Hd => "hd",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Both artifacts derived from one inference result.
#[derive(Debug, Clone)]
pub struct TieredImages {
    pub preview: DynamicImage,
    pub hd: DynamicImage,
}

/// Renders preview and HD artifacts from an inference result.
#[derive(Debug, Clone)]
pub struct TieringStage {
    preview_max_dim: u32,
    hd_max_dim: u32,
}

impl TieringStage {
    /// Create a tiering stage with the given dimension caps.
    pub fn new(preview_max_dim: u32, hd_max_dim: u32) -> Self {
        Self {
            preview_max_dim,
            hd_max_dim,
        }
    }

    /// Derive the preview and HD artifacts from an inference result.
    ///
    /// The HD artifact is the full result capped at the HD dimension; the
    /// preview is downscaled and watermarked. Neither tier is ever upscaled.
    pub fn tier(&self, image: &DynamicImage) -> TieredImages {
        let hd = resize_to_fit(image, self.hd_max_dim);

        let mut preview = resize_to_fit(image, self.preview_max_dim).to_rgb8();
        apply_watermark(&mut preview);

        TieredImages {
            preview: DynamicImage::ImageRgb8(preview),
            hd,
        }
    }
}

impl Default for TieringStage {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_MAX_DIM, DEFAULT_HD_MAX_DIM)
    }
}

/// Downscale so the longest dimension fits within `max_dim`.
///
/// Images already within bounds are returned unchanged.
fn resize_to_fit(image: &DynamicImage, max_dim: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_dim {
        image.clone()
    } else {
        image.resize(max_dim, max_dim, FilterType::Lanczos3)
    }
}

/// Blend a translucent white mark into the bottom-right corner.
///
/// Placement is a pure function of the image dimensions, so repeated runs on
/// the same input produce identical pixels.
fn apply_watermark(image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let mark_w = (width / 5).clamp(1, width);
    let mark_h = (height / 12).clamp(1, height);

    let inset_x = WATERMARK_INSET.min(width.saturating_sub(mark_w));
    let inset_y = WATERMARK_INSET.min(height.saturating_sub(mark_h));

    let x0 = width - mark_w - inset_x;
    let y0 = height - mark_h - inset_y;

    for y in y0..y0 + mark_h {
        for x in x0..x0 + mark_w {
            let px = image.get_pixel_mut(x, y);
            for c in px.0.iter_mut() {
                let blended =
                    (*c as f32) * (1.0 - WATERMARK_OPACITY) + 255.0 * WATERMARK_OPACITY;
                *c = blended.round().min(255.0) as u8;
            }
        }
    }
}
