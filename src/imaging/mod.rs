//! Image processing: pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image::ImageReader`, `DynamicImage::save_with_format` (PNG, JPEG) |
//! | **Anchored crop** | [`calculations::calculate_trim_window`] + `DynamicImage::crop_imm` |
//! | **Contain** | [`calculations::calculate_contain_dimensions`] + Lanczos3 `resize_exact` |
//! | **Opacity / mask** | per-channel linear blend ([`operations::blend`]) |
//! | **Padding** | `image::imageops::replace` onto a fresh canvas |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and scale geometry (unit testable)
//! - **Parameters**: Pixel modes, crop anchors, supported formats
//! - **Backend**: [`ImageBackend`] trait (load, save, directories) + [`RustBackend`]
//! - **Operations**: The per-destination pixel pipeline, pure over `DynamicImage`

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::{OperationError, render};
pub use params::{CropAnchor, PixelMode, SUPPORTED_EXTENSIONS, image_format};
pub use rust_backend::RustBackend;
