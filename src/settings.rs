//! Settings document module.
//!
//! Handles loading and validating `settings.json`, the one document that
//! describes where artwork comes from, where packaged graphics go, and what
//! every destination folder expects.
//!
//! ## Document Shape
//!
//! ```json
//! {
//!   "graphics_folder": "../game/graphics",
//!   "source_folder": "artwork",
//!   "rule_file_name": "_config.json",
//!   "templates": {
//!     "logo": { "width": 256, "height": 256, "trim": true }
//!   },
//!   "destinations": {
//!     "logos/{folder}": "logo",
//!     "logos/{folder}/small": { "width": 64, "height": 64, "padding_left": 4, "padding_right": 4 },
//!     "faces/{folder}": {
//!       "width": 180, "height": 220, "trim": true, "opacity": 0.9,
//!       "extension": "png",
//!       "mask": { "image": "masks/face.png", "opacity": 0.15 }
//!     }
//!   },
//!   "processing": { "max_processes": 4, "on_error": "abort" }
//! }
//! ```
//!
//! - Relative `graphics_folder`/`source_folder` resolve against the directory
//!   holding the settings file; mask images resolve against `source_folder`.
//! - A destination entry is either a template name or an inline spec.
//!   Templates are cloned per destination with only the location varying.
//! - `instructions` is accepted as an older name for `destinations`.
//!
//! Unknown keys are rejected to catch typos early.

use crate::destination::{
    DestinationSpec, Destinations, MaskSpec, Padding, SpecError, destination_folder,
};
use crate::naming::normalize_path;
use crate::types::DestinationId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the per-directory rule documents.
pub const DEFAULT_RULE_FILE_NAME: &str = "_config.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Destination '{destination}': {source}")]
    InvalidDestination {
        destination: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Destination '{destination}' must be a template name or an object")]
    InvalidEntry { destination: String },
    #[error("Destination '{destination}' references unknown template '{template}'")]
    UnknownTemplate {
        destination: String,
        template: String,
    },
    #[error("Destination '{0}' is declared twice")]
    DuplicateDestination(String),
    #[error("Settings validation error in '{name}': {source}")]
    Validation {
        name: String,
        #[source]
        source: SpecError,
    },
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub graphics_folder: PathBuf,
    pub source_folder: PathBuf,
    pub rule_file_name: String,
    pub destinations: Destinations,
    pub processing: ProcessingConfig,
}

/// Raw settings document as written on disk.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    graphics_folder: PathBuf,
    source_folder: PathBuf,
    #[serde(default = "default_rule_file_name")]
    rule_file_name: String,
    #[serde(default)]
    templates: BTreeMap<String, DestinationSettings>,
    #[serde(alias = "instructions")]
    destinations: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    processing: ProcessingConfig,
}

fn default_rule_file_name() -> String {
    DEFAULT_RULE_FILE_NAME.to_string()
}

/// One inline destination spec (or template) as written in settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationSettings {
    /// Total canvas width in pixels.
    pub width: u32,
    /// Total canvas height in pixels.
    pub height: u32,
    /// Fade factor applied after scaling (1.0 = untouched).
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Crop to the destination aspect ratio before scaling.
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub padding_top: u32,
    #[serde(default)]
    pub padding_right: u32,
    #[serde(default)]
    pub padding_bottom: u32,
    #[serde(default)]
    pub padding_left: u32,
    /// Forced output format (`png`, `jpg`, `jpeg`).
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub mask: Option<MaskSettings>,
}

fn default_opacity() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskSettings {
    /// Mask image path, relative to the source folder.
    pub image: PathBuf,
    pub opacity: f32,
}

impl DestinationSettings {
    /// Build a validated spec at the given location.
    pub fn to_spec(
        &self,
        id: DestinationId,
        folder: PathBuf,
        source_folder: &Path,
    ) -> Result<DestinationSpec, SpecError> {
        let spec = DestinationSpec {
            padding: Padding {
                top: self.padding_top,
                right: self.padding_right,
                bottom: self.padding_bottom,
                left: self.padding_left,
            },
            opacity: self.opacity,
            trim: self.trim,
            extension: self
                .extension
                .as_deref()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase()),
            mask: self.mask.as_ref().map(|m| MaskSpec {
                image: normalize_path(&source_folder.join(&m.image)),
                opacity: m.opacity,
            }),
            ..DestinationSpec::new(id, folder, self.width, self.height)
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// What to do when one image fails to load, render, or save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failing image.
    #[default]
    Abort,
    /// Log the failure, skip the image, and report all failures at the end.
    Continue,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Per-image failure policy.
    pub on_error: ErrorPolicy,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl Settings {
    /// Load settings from a file. Relative folders resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new(""));
        Self::parse(&content, base)
    }

    /// Parse and validate a settings document.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, SettingsError> {
        let file: SettingsFile = serde_json::from_str(content)?;

        let graphics_folder = normalize_path(&base_dir.join(&file.graphics_folder));
        let source_folder = normalize_path(&base_dir.join(&file.source_folder));

        let mut templates = BTreeMap::new();
        for (name, template) in &file.templates {
            let spec = template
                .to_spec(DestinationId::new(""), PathBuf::new(), &source_folder)
                .map_err(|source| SettingsError::Validation {
                    name: format!("template {name}"),
                    source,
                })?;
            templates.insert(name.clone(), spec);
        }

        let mut destinations = Destinations::new();
        for (relative, entry) in file.destinations {
            let id = DestinationId::new(&relative);
            let folder = destination_folder(&graphics_folder, &id);

            let spec = match entry {
                serde_json::Value::String(template) => templates
                    .get(&template)
                    .map(|t| t.with_location(id.clone(), folder))
                    .ok_or_else(|| SettingsError::UnknownTemplate {
                        destination: relative.clone(),
                        template,
                    })?,
                value @ serde_json::Value::Object(_) => {
                    let inline: DestinationSettings = serde_json::from_value(value).map_err(
                        |source| SettingsError::InvalidDestination {
                            destination: relative.clone(),
                            source,
                        },
                    )?;
                    inline
                        .to_spec(id.clone(), folder, &source_folder)
                        .map_err(|source| SettingsError::Validation {
                            name: relative.clone(),
                            source,
                        })?
                }
                _ => {
                    return Err(SettingsError::InvalidEntry {
                        destination: relative,
                    });
                }
            };

            if !destinations.insert(spec) {
                return Err(SettingsError::DuplicateDestination(id.to_string()));
            }
        }

        Ok(Self {
            graphics_folder,
            source_folder,
            rule_file_name: file.rule_file_name,
            destinations,
            processing: file.processing,
        })
    }
}

/// Returns a stock `settings.json` showing every key.
///
/// Used by the `gen-settings` CLI command.
pub fn stock_settings_json() -> &'static str {
    r#"{
  "graphics_folder": "graphics",
  "source_folder": "artwork",
  "rule_file_name": "_config.json",
  "templates": {
    "logo": {
      "width": 256,
      "height": 256,
      "trim": true
    }
  },
  "destinations": {
    "logos/{folder}": "logo",
    "logos/{folder}/small": {
      "width": 72,
      "height": 64,
      "padding_left": 4,
      "padding_right": 4
    },
    "faces/{folder}": {
      "width": 180,
      "height": 220,
      "trim": true,
      "opacity": 1.0,
      "padding_top": 0,
      "padding_right": 0,
      "padding_bottom": 0,
      "padding_left": 0,
      "extension": "png",
      "mask": {
        "image": "masks/face.png",
        "opacity": 0.15
      }
    }
  },
  "processing": {
    "max_processes": null,
    "on_error": "abort"
  }
}
"#
}
