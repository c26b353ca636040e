//! Image I/O backend trait and shared error type.
//!
//! The [`ImageBackend`] trait covers everything the pipeline does outside
//! memory: decoding a source, encoding an output, and creating destination
//! directories. Pixel work itself is pure (see [`operations`](super::operations))
//! and never goes through the backend.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` in this module's test submodule.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("Unsupported output format for {0}")]
    UnsupportedFormat(PathBuf),
}

/// Trait for image I/O backends.
///
/// Backends are shared across rayon workers, hence `Sync`.
pub trait ImageBackend: Sync {
    /// Decode an image from disk.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode an image, choosing the format from the path's extension.
    fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError>;

    /// Create a directory and its parents. An existing directory is not an error.
    fn ensure_dir(&self, path: &Path) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock backend that serves preset images and records operations.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub images: Mutex<HashMap<PathBuf, DynamicImage>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Load(String),
        Save {
            path: String,
            width: u32,
            height: u32,
        },
        EnsureDir(String),
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_image(self, path: impl Into<PathBuf>, image: DynamicImage) -> Self {
            self.images.lock().unwrap().insert(path.into(), image);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Paths of every saved image, sorted.
        pub fn saved_paths(&self) -> Vec<String> {
            let mut paths: Vec<String> = self
                .get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Save { path, .. } => Some(path),
                    _ => None,
                })
                .collect();
            paths.sort();
            paths
        }
    }

    impl ImageBackend for MockBackend {
        fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Load(path.to_string_lossy().to_string()));

            self.images
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BackendError::Decode {
                    path: path.to_path_buf(),
                    message: "no mock image".to_string(),
                })
        }

        fn save(&self, image: &DynamicImage, path: &Path) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Save {
                path: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
            });
            Ok(())
        }

        fn ensure_dir(&self, path: &Path) -> Result<(), BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::EnsureDir(path.to_string_lossy().to_string()));
            Ok(())
        }
    }

    #[test]
    fn mock_serves_preset_image() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(8, 4));
        let backend = MockBackend::new().with_image("/src/a.jpg", img);

        let loaded = backend.load(Path::new("/src/a.jpg")).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 4));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Load(p) if p == "/src/a.jpg"));
    }

    #[test]
    fn mock_missing_image_is_decode_error() {
        let backend = MockBackend::new();
        let result = backend.load(Path::new("/src/missing.png"));
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn mock_records_saves_with_dimensions() {
        let backend = MockBackend::new();
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(3, 5));
        backend.save(&img, Path::new("/gfx/b.png")).unwrap();
        backend.save(&img, Path::new("/gfx/a.png")).unwrap();

        assert_eq!(backend.saved_paths(), vec!["/gfx/a.png", "/gfx/b.png"]);
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Save {
                width: 3,
                height: 5,
                ..
            }
        ));
    }
}
