//! Destination specs: one output target's canvas geometry and processing options.
//!
//! A [`DestinationSpec`] is built once from the settings document and is
//! read-only for the rest of the run. Many effective configs refer to the
//! same spec by its [`DestinationId`]; the [`Destinations`] registry owns them.
//!
//! ## Geometry
//!
//! ```text
//! ┌──────────── total_width ────────────┐
//! │           padding_top               │
//! │        ┌── real_width ──┐           │
//! │ pad_l  │    image       │  pad_r    │ total_height
//! │        └────────────────┘           │
//! │           padding_bottom            │
//! └─────────────────────────────────────┘
//! ```
//!
//! The image is fitted into the real (post-padding) box, then pasted onto the
//! total canvas at `(padding_left, padding_top)`.

use crate::imaging::PixelMode;
use crate::naming::substitute_folder;
use crate::types::DestinationId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a destination spec failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("padding leaves no room: canvas {total_width}x{total_height}, real area {real_width}x{real_height}")]
    NoRealArea {
        total_width: u32,
        total_height: u32,
        real_width: u32,
        real_height: u32,
    },
    #[error("opacity must be 0.0-1.0, got {0}")]
    Opacity(f32),
    #[error("unsupported extension '{0}'")]
    Extension(String),
    #[error("mask opacity must be 0.0-1.0, got {0}")]
    MaskOpacity(f32),
}

/// Padding around the real image area, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Mask image blended over every image sent to a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSpec {
    /// Absolute path of the mask image (resolved against the source folder).
    pub image: PathBuf,
    /// Blend factor: 0.0 keeps the image, 1.0 shows only the mask.
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinationSpec {
    pub id: DestinationId,
    /// Destination folder; may contain a `{folder}` placeholder.
    pub folder: PathBuf,
    pub total_width: u32,
    pub total_height: u32,
    pub padding: Padding,
    pub opacity: f32,
    /// Crop to the destination aspect ratio before scaling.
    pub trim: bool,
    /// Forced output extension (lowercase, no dot).
    pub extension: Option<String>,
    pub mask: Option<MaskSpec>,
}

impl DestinationSpec {
    /// A spec with the given canvas and every option at its default.
    pub fn new(id: DestinationId, folder: PathBuf, total_width: u32, total_height: u32) -> Self {
        Self {
            id,
            folder,
            total_width,
            total_height,
            padding: Padding::default(),
            opacity: 1.0,
            trim: false,
            extension: None,
            mask: None,
        }
    }

    /// Clone a template spec for a concrete destination, varying only its location.
    pub fn with_location(&self, id: DestinationId, folder: PathBuf) -> Self {
        Self {
            id,
            folder,
            ..self.clone()
        }
    }

    pub fn real_width(&self) -> u32 {
        self.total_width
            .saturating_sub(self.padding.left)
            .saturating_sub(self.padding.right)
    }

    pub fn real_height(&self) -> u32 {
        self.total_height
            .saturating_sub(self.padding.top)
            .saturating_sub(self.padding.bottom)
    }

    /// Real (post-padding) box as `(width, height)`.
    pub fn real_size(&self) -> (u32, u32) {
        (self.real_width(), self.real_height())
    }

    pub fn has_padding(&self) -> bool {
        self.real_width() != self.total_width || self.real_height() != self.total_height
    }

    /// Check the geometry and option ranges.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.real_width() == 0 || self.real_height() == 0 {
            return Err(SpecError::NoRealArea {
                total_width: self.total_width,
                total_height: self.total_height,
                real_width: self.real_width(),
                real_height: self.real_height(),
            });
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(SpecError::Opacity(self.opacity));
        }
        if let Some(ext) = &self.extension {
            if PixelMode::from_extension(ext).is_none() {
                return Err(SpecError::Extension(ext.clone()));
            }
        }
        if let Some(mask) = &self.mask {
            if !(0.0..=1.0).contains(&mask.opacity) {
                return Err(SpecError::MaskOpacity(mask.opacity));
            }
        }
        Ok(())
    }

    /// Concrete output directory for a resolved folder name.
    pub fn output_dir(&self, folder_name: &str) -> PathBuf {
        PathBuf::from(substitute_folder(
            &self.folder.to_string_lossy(),
            folder_name,
        ))
    }

    /// Output extension: the forced one when set, otherwise the source's.
    pub fn output_extension<'a>(&'a self, source_extension: &'a str) -> &'a str {
        self.extension.as_deref().unwrap_or(source_extension)
    }
}

/// Registry of all destination specs, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct Destinations {
    specs: BTreeMap<DestinationId, DestinationSpec>,
}

impl Destinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec. Returns `false` (and keeps the existing one) on a duplicate identity.
    pub fn insert(&mut self, spec: DestinationSpec) -> bool {
        if self.specs.contains_key(&spec.id) {
            return false;
        }
        self.specs.insert(spec.id.clone(), spec);
        true
    }

    pub fn get(&self, id: &DestinationId) -> Option<&DestinationSpec> {
        self.specs.get(id)
    }

    /// Resolve a relative path written in a rule document to a known identity.
    pub fn reference(&self, relative: &str) -> Option<DestinationId> {
        let id = DestinationId::new(relative);
        self.specs.contains_key(&id).then_some(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DestinationSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<DestinationSpec> for Destinations {
    fn from_iter<I: IntoIterator<Item = DestinationSpec>>(iter: I) -> Self {
        let mut destinations = Self::new();
        for spec in iter {
            destinations.insert(spec);
        }
        destinations
    }
}

/// Resolve a destination folder for an identity under the graphics folder.
pub fn destination_folder(graphics_folder: &Path, id: &DestinationId) -> PathBuf {
    if id.as_str().is_empty() {
        graphics_folder.to_path_buf()
    } else {
        graphics_folder.join(id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(w: u32, h: u32) -> DestinationSpec {
        DestinationSpec::new(
            DestinationId::new("faces"),
            PathBuf::from("/gfx/faces"),
            w,
            h,
        )
    }

    #[test]
    fn real_size_subtracts_padding() {
        let mut s = spec(100, 80);
        s.padding = Padding {
            top: 5,
            right: 10,
            bottom: 15,
            left: 20,
        };
        assert_eq!(s.real_size(), (70, 60));
        assert!(s.has_padding());
    }

    #[test]
    fn no_padding_means_real_equals_total() {
        let s = spec(100, 80);
        assert_eq!(s.real_size(), (100, 80));
        assert!(!s.has_padding());
    }

    #[test]
    fn validate_rejects_padding_that_consumes_canvas() {
        let mut s = spec(10, 10);
        s.padding.left = 6;
        s.padding.right = 4;
        assert_eq!(
            s.validate(),
            Err(SpecError::NoRealArea {
                total_width: 10,
                total_height: 10,
                real_width: 0,
                real_height: 10,
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_opacity() {
        let mut s = spec(10, 10);
        s.opacity = 1.5;
        assert_eq!(s.validate(), Err(SpecError::Opacity(1.5)));
    }

    #[test]
    fn validate_rejects_unknown_extension() {
        let mut s = spec(10, 10);
        s.extension = Some("gif".into());
        assert_eq!(s.validate(), Err(SpecError::Extension("gif".into())));
    }

    #[test]
    fn validate_rejects_out_of_range_mask_opacity() {
        let mut s = spec(10, 10);
        s.mask = Some(MaskSpec {
            image: PathBuf::from("/src/mask.png"),
            opacity: -0.1,
        });
        assert_eq!(s.validate(), Err(SpecError::MaskOpacity(-0.1)));
    }

    #[test]
    fn output_dir_substitutes_folder() {
        let mut s = spec(10, 10);
        s.folder = PathBuf::from("/gfx/faces/{folder}");
        assert_eq!(s.output_dir("england"), PathBuf::from("/gfx/faces/england"));
    }

    #[test]
    fn output_extension_prefers_forced() {
        let mut s = spec(10, 10);
        assert_eq!(s.output_extension("jpg"), "jpg");
        s.extension = Some("png".into());
        assert_eq!(s.output_extension("jpg"), "png");
    }

    #[test]
    fn with_location_varies_only_location() {
        let mut template = spec(64, 64);
        template.trim = true;
        let clone = template.with_location(DestinationId::new("logos"), PathBuf::from("/gfx/logos"));
        assert_eq!(clone.id.as_str(), "logos");
        assert_eq!(clone.folder, PathBuf::from("/gfx/logos"));
        assert!(clone.trim);
        assert_eq!(clone.real_size(), (64, 64));
    }

    #[test]
    fn registry_rejects_duplicates_and_resolves_references() {
        let mut reg = Destinations::new();
        assert!(reg.insert(spec(10, 10)));
        assert!(!reg.insert(spec(20, 20)));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.reference("./faces/"), Some(DestinationId::new("faces")));
        assert_eq!(reg.reference("logos"), None);
    }

    #[test]
    fn destination_folder_joins_identity() {
        let gfx = Path::new("/gfx");
        assert_eq!(
            destination_folder(gfx, &DestinationId::new("a/b")),
            PathBuf::from("/gfx/a/b")
        );
        assert_eq!(destination_folder(gfx, &DestinationId::new(".")), PathBuf::from("/gfx"));
    }
}
