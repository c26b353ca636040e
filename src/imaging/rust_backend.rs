//! Pure Rust image backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::ImageReader` with format sniffing |
//! | Encode (PNG, JPEG) | `DynamicImage::save_with_format` |
//! | Directories | `std::fs::create_dir_all` (idempotent) |
//!
//! JPEG cannot carry alpha, so alpha-capable images headed for a `.jpg`
//! output are flattened to RGB on save.

use super::backend::{BackendError, ImageBackend};
use super::params::{PixelMode, SUPPORTED_EXTENSIONS, image_format};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Whether a path has one of the supported extensions (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        let io_err = |source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        };
        ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|e| BackendError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(image_format)
            .ok_or_else(|| BackendError::UnsupportedFormat(path.to_path_buf()))?;

        let encoded = match format {
            ImageFormat::Jpeg if image.color().has_alpha() => PixelMode::Rgb.convert(image.clone()),
            _ => image.clone(),
        };

        encoded
            .save_with_format(path, format)
            .map_err(|e| BackendError::Encode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
        std::fs::create_dir_all(path).map_err(|source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
