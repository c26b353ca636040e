//! Parameter types for image operations.
//!
//! These types describe *what* the pipeline works with, not *how* pixels are
//! moved. The closed set of formats lives here so that settings validation,
//! discovery, and the backend agree on it.
//!
//! ## Types
//!
//! - [`PixelMode`]: Opaque RGB or alpha-capable RGBA, implied by a file extension.
//! - [`CropAnchor`]: Per-axis position (0.0–1.0) of the window kept by an anchored crop.

use image::{DynamicImage, ImageFormat};

/// Extensions the pipeline reads and writes, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Working pixel mode of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// Opaque 8-bit RGB (JPEG).
    Rgb,
    /// 8-bit RGB with alpha (PNG).
    Rgba,
}

impl PixelMode {
    /// Mode implied by a file extension (case-insensitive, leading dot tolerated).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Rgba),
            "jpg" | "jpeg" => Some(Self::Rgb),
            _ => None,
        }
    }

    /// Mode of a decoded image, if it is already in one of the working modes.
    pub fn of(image: &DynamicImage) -> Option<Self> {
        match image {
            DynamicImage::ImageRgb8(_) => Some(Self::Rgb),
            DynamicImage::ImageRgba8(_) => Some(Self::Rgba),
            _ => None,
        }
    }

    /// Convert an image into this mode. Images already in the mode are returned as-is.
    pub fn convert(self, image: DynamicImage) -> DynamicImage {
        if Self::of(&image) == Some(self) {
            return image;
        }
        match self {
            Self::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
            Self::Rgba => DynamicImage::ImageRgba8(image.to_rgba8()),
        }
    }
}

/// Encoder format for an extension.
pub fn image_format(extension: &str) -> Option<ImageFormat> {
    match PixelMode::from_extension(extension)? {
        PixelMode::Rgba => Some(ImageFormat::Png),
        PixelMode::Rgb => Some(ImageFormat::Jpeg),
    }
}

/// Where an anchored crop keeps its window, per axis.
///
/// - `0.0` keeps the bottom (vertical crop) or right (horizontal crop) end
/// - `1.0` keeps the top or left end
/// - `0.5` keeps the middle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropAnchor {
    pub x: f32,
    pub y: f32,
}

impl CropAnchor {
    /// Same anchor on both axes.
    pub fn uniform(value: f32) -> Self {
        Self { x: value, y: value }
    }
}

impl Default for CropAnchor {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};

    #[test]
    fn mode_from_extension() {
        assert_eq!(PixelMode::from_extension("png"), Some(PixelMode::Rgba));
        assert_eq!(PixelMode::from_extension(".JPG"), Some(PixelMode::Rgb));
        assert_eq!(PixelMode::from_extension("jpeg"), Some(PixelMode::Rgb));
        assert_eq!(PixelMode::from_extension("gif"), None);
    }

    #[test]
    fn every_supported_extension_has_a_format() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(image_format(ext).is_some(), "no format for {ext}");
        }
    }

    #[test]
    fn convert_rgba_to_rgb_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let converted = PixelMode::Rgb.convert(img);
        assert_eq!(PixelMode::of(&converted), Some(PixelMode::Rgb));
    }

    #[test]
    fn convert_same_mode_is_noop() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 1, image::Rgb([1, 2, 3])));
        let converted = PixelMode::Rgb.convert(img.clone());
        assert_eq!(converted, img);
    }

    #[test]
    fn grayscale_has_no_working_mode() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(1, 1));
        assert_eq!(PixelMode::of(&img), None);
    }

    #[test]
    fn default_anchor_is_centered() {
        assert_eq!(CropAnchor::default(), CropAnchor { x: 0.5, y: 0.5 });
    }
}
