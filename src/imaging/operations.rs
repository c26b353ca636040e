//! The per-destination pixel pipeline.
//!
//! [`render`] takes one decoded source image and one [`DestinationSpec`] and
//! produces the exact canvas that is written to disk:
//!
//! ```text
//! trim (anchored crop) → contain (fit the real box) → opacity → mask → pad
//! ```
//!
//! Every step is a pure function from image to image. The source is cloned
//! once per destination, so the same decoded image can feed any number of
//! destinations without one leaking into another.

use super::calculations::{calculate_contain_dimensions, calculate_trim_window};
use super::params::{CropAnchor, PixelMode};
use crate::destination::DestinationSpec;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OperationError {
    #[error("Cannot blend images of different sizes: {expected:?} vs {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Crop `image` to the aspect ratio of `target` along one axis.
pub fn trim(image: DynamicImage, target: (u32, u32), anchor: CropAnchor) -> DynamicImage {
    match calculate_trim_window(image.dimensions(), target, anchor) {
        Some(w) => image.crop_imm(w.x, w.y, w.width, w.height),
        None => image,
    }
}

/// Uniformly scale `image` so it fits inside `bounds`, touching at least one edge.
pub fn contain(image: DynamicImage, bounds: (u32, u32)) -> DynamicImage {
    let (width, height) = calculate_contain_dimensions(image.dimensions(), bounds);
    if (width, height) == image.dimensions() {
        return image;
    }
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Linear per-channel blend: `base × (1 − alpha) + overlay × alpha`.
///
/// The result keeps `base`'s pixel mode; `overlay` is converted to it.
/// Both images must have the same dimensions.
pub fn blend(
    base: &DynamicImage,
    overlay: &DynamicImage,
    alpha: f32,
) -> Result<DynamicImage, OperationError> {
    if base.dimensions() != overlay.dimensions() {
        return Err(OperationError::SizeMismatch {
            expected: base.dimensions(),
            actual: overlay.dimensions(),
        });
    }

    match PixelMode::of(base).unwrap_or(PixelMode::Rgba) {
        PixelMode::Rgb => {
            let mut out = base.to_rgb8();
            mix_into(&mut out, &overlay.to_rgb8(), alpha);
            Ok(DynamicImage::ImageRgb8(out))
        }
        PixelMode::Rgba => {
            let mut out = base.to_rgba8();
            mix_into(&mut out, &overlay.to_rgba8(), alpha);
            Ok(DynamicImage::ImageRgba8(out))
        }
    }
}

fn mix_into(out: &mut [u8], overlay: &[u8], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (b, &o) in out.iter_mut().zip(overlay) {
        let mixed = *b as f32 * (1.0 - alpha) + o as f32 * alpha;
        *b = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

/// Fade `image` toward a fully transparent black canvas of the same size and mode.
pub fn apply_opacity(image: DynamicImage, opacity: f32) -> DynamicImage {
    let canvas = blank_canvas(PixelMode::of(&image).unwrap_or(PixelMode::Rgba), image.dimensions());
    // Same dimensions by construction
    blend(&canvas, &image, opacity).unwrap_or(image)
}

/// Blend the mask over `image` at the mask's opacity. No resizing is done.
pub fn apply_mask(
    image: &DynamicImage,
    mask: &DynamicImage,
    opacity: f32,
) -> Result<DynamicImage, OperationError> {
    blend(image, mask, opacity)
}

/// Paste `image` at `(padding_left, padding_top)` on a canvas of the destination's total size.
///
/// The canvas is transparent for alpha-capable modes and opaque black otherwise.
/// Without padding the image is returned untouched.
pub fn pad(image: DynamicImage, dest: &DestinationSpec, mode: PixelMode) -> DynamicImage {
    if !dest.has_padding() {
        return image;
    }
    let (x, y) = (dest.padding.left as i64, dest.padding.top as i64);
    match mode {
        PixelMode::Rgb => {
            let mut canvas = RgbImage::new(dest.total_width, dest.total_height);
            imageops::replace(&mut canvas, &image.to_rgb8(), x, y);
            DynamicImage::ImageRgb8(canvas)
        }
        PixelMode::Rgba => {
            let mut canvas = RgbaImage::new(dest.total_width, dest.total_height);
            imageops::replace(&mut canvas, &image.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

/// An all-zero image: transparent black with alpha, black without.
fn blank_canvas(mode: PixelMode, (width, height): (u32, u32)) -> DynamicImage {
    match mode {
        PixelMode::Rgb => DynamicImage::ImageRgb8(RgbImage::new(width, height)),
        PixelMode::Rgba => DynamicImage::ImageRgba8(RgbaImage::new(width, height)),
    }
}

/// Run the full pipeline for one destination.
///
/// `source` must already be in `mode`; the caller normalizes it once per image.
pub fn render(
    source: &DynamicImage,
    mode: PixelMode,
    dest: &DestinationSpec,
    anchor: CropAnchor,
    mask: Option<&DynamicImage>,
) -> Result<DynamicImage, OperationError> {
    let mut image = source.clone();

    if dest.trim {
        image = trim(image, dest.real_size(), anchor);
    }

    image = contain(image, dest.real_size());

    if dest.opacity < 1.0 {
        image = apply_opacity(image, dest.opacity);
    }

    if let (Some(mask_image), Some(mask_spec)) = (mask, &dest.mask) {
        image = apply_mask(&image, mask_image, mask_spec.opacity)?;
    }

    Ok(pad(image, dest, mode))
}
