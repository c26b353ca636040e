//! Shared types used across the resolve and process stages.

use crate::naming::{base_name, normalize_destination, normalize_path};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a destination: its path relative to the graphics folder,
/// normalized by [`normalize_destination`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(relative: &str) -> Self {
        Self(normalize_destination(relative))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered source image.
///
/// `stem_path` is the image path without its extension. File-scoped rules
/// name images this way, and it is also what the default `save_as` derives from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageSource {
    /// Full normalized path, extension included.
    pub path: PathBuf,
    /// Directory containing the image.
    pub directory: PathBuf,
    /// Path without extension.
    pub stem_path: PathBuf,
    /// File name without extension.
    pub stem: String,
    /// Lowercased extension without the dot.
    pub extension: String,
}

impl ImageSource {
    /// Build from a file path. Returns `None` for paths without a file name or extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = normalize_path(path);
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(Self {
            stem_path: directory.join(&stem),
            directory,
            stem,
            extension,
            path,
        })
    }

    /// Basename of the directory holding the image.
    pub fn folder_name(&self) -> String {
        base_name(&self.directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_id_is_normalized() {
        assert_eq!(DestinationId::new("faces/small/"), DestinationId::new("faces\\small"));
        assert_eq!(DestinationId::new("./logos").as_str(), "logos");
    }

    #[test]
    fn image_source_splits_path() {
        let img = ImageSource::from_path(Path::new("/src/clubs/./england/Arsenal.PNG")).unwrap();
        assert_eq!(img.path, PathBuf::from("/src/clubs/england/Arsenal.PNG"));
        assert_eq!(img.directory, PathBuf::from("/src/clubs/england"));
        assert_eq!(img.stem_path, PathBuf::from("/src/clubs/england/Arsenal"));
        assert_eq!(img.stem, "Arsenal");
        assert_eq!(img.extension, "png");
        assert_eq!(img.folder_name(), "england");
    }

    #[test]
    fn image_source_requires_extension() {
        assert!(ImageSource::from_path(Path::new("/src/README")).is_none());
    }
}
