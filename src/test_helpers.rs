//! Shared test utilities for the graphics-packer test suite.
//!
//! Provides synthetic images, destination specs, and temp-tree builders so
//! module tests never need fixture files on disk.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_png(&tmp.path().join("art/clubs/arsenal.png"), 40, 20);
//! write_file(&tmp.path().join("art/clubs/_config.json"), r#"{".": {"ignore": true}}"#);
//!
//! let dest = spec("logos", 32, 32);
//! assert_eq!(dest.real_size(), (32, 32));
//! ```

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

use crate::destination::{DestinationSpec, Destinations};
use crate::types::{DestinationId, ImageSource};

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image whose left half (`x < width / 2`) is `left` and right half is `right`.
pub fn halves_rgb(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 { Rgb(left) } else { Rgb(right) }
    });
    DynamicImage::ImageRgb8(img)
}

/// RGBA image filled with one pixel value.
pub fn solid_rgba(width: u32, height: u32, pixel: [u8; 4]) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(pixel)))
}

// =========================================================================
// Destination specs
// =========================================================================

/// Spec with the given canvas, located at `/gfx/<id>`, every option default.
pub fn spec(id: &str, width: u32, height: u32) -> DestinationSpec {
    let id = DestinationId::new(id);
    let folder = PathBuf::from("/gfx").join(id.as_str());
    DestinationSpec::new(id, folder, width, height)
}

/// Registry holding the given specs.
pub fn registry(specs: impl IntoIterator<Item = DestinationSpec>) -> Destinations {
    specs.into_iter().collect()
}

/// Image source for a path, panicking on paths without an extension.
pub fn source(path: &str) -> ImageSource {
    ImageSource::from_path(Path::new(path)).unwrap()
}

// =========================================================================
// Temp trees
// =========================================================================

/// Write a text file, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Write a small real PNG (opaque gray), creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([128, 128, 128, 255]))
        .save(path)
        .unwrap();
}

/// Write a small real JPEG (flat color), creating parent directories.
pub fn write_jpg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, Rgb([200, 40, 40]))
        .save(path)
        .unwrap();
}
