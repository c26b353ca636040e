//! Rule documents and the rule index.
//!
//! Every directory under the source folder may hold one rule document
//! (`_config.json` by default). A document is a JSON object whose keys are
//! paths relative to the document's directory:
//!
//! ```json
//! {
//!   ".":           { "include": ["logos/{folder}"] },
//!   "retired/":    { "ignore": true },
//!   "arsenal":     { "save_as": "1", "duplicates": ["gunners"], "crop_anchor": 0.2 },
//!   "chelsea.png": { "override": ["faces/{folder}"] }
//! }
//! ```
//!
//! - `.` or a key ending in `/` (or `\`) is folder-scoped: it applies to every
//!   image in that directory subtree.
//! - Any other key is file-scoped and names one image by its path without
//!   extension. The full file name is accepted too.
//! - A key may appear only once per document.
//!
//! `image_centre_x` and `image_centre_y` are older spellings of the anchor
//! axes. `image_centre_x` means the same as `crop_anchor_x`, but
//! `image_centre_y` counts from the top edge, so it is stored as
//! `1.0 - value`.
//!
//! Documents are validated eagerly when the index is built. A bad rule
//! anywhere fails the whole run before any image is touched.

use crate::destination::Destinations;
use crate::naming::{is_folder_key, normalize_path};
use crate::types::{DestinationId, ImageSource};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Cannot read rule document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Rule document in {directory} is not an object of rules: {source}")]
    Document {
        directory: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Rule '{key}' in {directory}: {source}")]
    Schema {
        directory: PathBuf,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Rule '{key}' in {directory}: {field} entry '{path}' is not a known destination")]
    UnknownDestination {
        directory: PathBuf,
        key: String,
        field: &'static str,
        path: String,
    },
    #[error("Rule '{key}' in {directory}: folder rules cannot set {field}")]
    FolderRuleField {
        directory: PathBuf,
        key: String,
        field: &'static str,
    },
    #[error("Rule '{key}' in {directory}: override cannot be combined with include or exclude")]
    OverrideWithIncludeExclude { directory: PathBuf, key: String },
    #[error("Rule '{key}' in {directory}: destination '{destination}' is both included and excluded")]
    IncludeExcludeConflict {
        directory: PathBuf,
        key: String,
        destination: DestinationId,
    },
    #[error("Rule '{key}' in {directory}: {field} must be 0.0-1.0, got {value}")]
    AnchorOutOfRange {
        directory: PathBuf,
        key: String,
        field: &'static str,
        value: f32,
    },
}

/// One rule as written in a document, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSettings {
    ignore: Option<bool>,
    crop_anchor: Option<f32>,
    #[serde(alias = "image_centre_x")]
    crop_anchor_x: Option<f32>,
    crop_anchor_y: Option<f32>,
    /// Vertical anchor measured from the top edge.
    image_centre_y: Option<f32>,
    save_as: Option<String>,
    folder: Option<String>,
    duplicates: Option<Vec<String>>,
    #[serde(rename = "override", default)]
    override_with: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

/// How a rule changes the inherited destination set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationChange {
    /// Replace the inherited set entirely.
    Override(BTreeSet<DestinationId>),
    /// Add `include` entries, then remove `exclude` entries.
    Adjust {
        include: BTreeSet<DestinationId>,
        exclude: BTreeSet<DestinationId>,
    },
}

impl Default for DestinationChange {
    fn default() -> Self {
        Self::Adjust {
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
        }
    }
}

/// A validated rule.
///
/// `None` fields were not mentioned by the rule and never clobber an
/// inherited value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    /// Directory of the document that declared this rule.
    pub directory: PathBuf,
    /// Key as written in the document.
    pub key: String,
    /// What the rule governs: a subtree root for folder rules, an image path
    /// (usually without extension) for file rules.
    pub target: PathBuf,
    pub is_folder: bool,
    pub ignore: Option<bool>,
    pub crop_anchor_x: Option<f32>,
    pub crop_anchor_y: Option<f32>,
    /// `Some("")` resets to the image's own name.
    pub save_as: Option<String>,
    /// `Some("")` resets to the source folder's name.
    pub folder: Option<String>,
    pub duplicates: Option<BTreeSet<String>>,
    pub destinations: DestinationChange,
}

impl Rule {
    /// Whether the rule governs this image.
    ///
    /// Folder rules match every image at or below their target directory
    /// (component-wise). File rules match the image path with or without extension.
    pub fn applies_to(&self, image: &ImageSource) -> bool {
        if self.is_folder {
            image.directory.starts_with(&self.target)
        } else {
            image.stem_path == self.target || image.path == self.target
        }
    }

    /// Ordering inside one document: folder rules first, then by target.
    fn sort_key(&self) -> (bool, &Path) {
        (!self.is_folder, &self.target)
    }

    fn parse(
        directory: &Path,
        key: &str,
        value: serde_json::Value,
        destinations: &Destinations,
    ) -> Result<Self, RuleError> {
        let raw: RuleSettings =
            serde_json::from_value(value).map_err(|source| RuleError::Schema {
                directory: directory.to_path_buf(),
                key: key.to_string(),
                source,
            })?;
        let is_folder = is_folder_key(key);

        let context = RuleContext {
            directory,
            key,
            destinations,
        };

        if is_folder {
            if raw.save_as.as_deref().is_some_and(|s| !s.is_empty()) {
                return Err(context.folder_field("save_as"));
            }
            if raw.duplicates.as_ref().is_some_and(|d| !d.is_empty()) {
                return Err(context.folder_field("duplicates"));
            }
        }

        let crop_anchor = context.anchor("crop_anchor", raw.crop_anchor)?;
        let crop_anchor_x = context.anchor("crop_anchor_x", raw.crop_anchor_x)?.or(crop_anchor);
        let legacy_y = context
            .anchor("image_centre_y", raw.image_centre_y)?
            .map(|v| 1.0 - v);
        let crop_anchor_y = context
            .anchor("crop_anchor_y", raw.crop_anchor_y)?
            .or(legacy_y)
            .or(crop_anchor);

        let override_with = context.references("override", &raw.override_with)?;
        let include = context.references("include", &raw.include)?;
        let exclude = context.references("exclude", &raw.exclude)?;

        let destinations = if override_with.is_empty() {
            if let Some(both) = include.intersection(&exclude).next() {
                return Err(RuleError::IncludeExcludeConflict {
                    directory: directory.to_path_buf(),
                    key: key.to_string(),
                    destination: both.clone(),
                });
            }
            DestinationChange::Adjust { include, exclude }
        } else {
            if !include.is_empty() || !exclude.is_empty() {
                return Err(RuleError::OverrideWithIncludeExclude {
                    directory: directory.to_path_buf(),
                    key: key.to_string(),
                });
            }
            DestinationChange::Override(override_with)
        };

        Ok(Self {
            directory: directory.to_path_buf(),
            key: key.to_string(),
            target: rule_target(directory, key),
            is_folder,
            ignore: raw.ignore,
            crop_anchor_x,
            crop_anchor_y,
            save_as: raw.save_as,
            folder: raw.folder,
            duplicates: raw.duplicates.map(|d| d.into_iter().collect()),
            destinations,
        })
    }
}

/// Where a rule came from, for error reporting during parsing.
struct RuleContext<'a> {
    directory: &'a Path,
    key: &'a str,
    destinations: &'a Destinations,
}

impl RuleContext<'_> {
    fn folder_field(&self, field: &'static str) -> RuleError {
        RuleError::FolderRuleField {
            directory: self.directory.to_path_buf(),
            key: self.key.to_string(),
            field,
        }
    }

    fn anchor(&self, field: &'static str, value: Option<f32>) -> Result<Option<f32>, RuleError> {
        match value {
            Some(v) if !(0.0..=1.0).contains(&v) => Err(RuleError::AnchorOutOfRange {
                directory: self.directory.to_path_buf(),
                key: self.key.to_string(),
                field,
                value: v,
            }),
            other => Ok(other),
        }
    }

    fn references(
        &self,
        field: &'static str,
        paths: &[String],
    ) -> Result<BTreeSet<DestinationId>, RuleError> {
        paths
            .iter()
            .map(|path| {
                self.destinations
                    .reference(path)
                    .ok_or_else(|| RuleError::UnknownDestination {
                        directory: self.directory.to_path_buf(),
                        key: self.key.to_string(),
                        field,
                        path: path.clone(),
                    })
            })
            .collect()
    }
}

/// Absolute target of a rule key inside `directory`.
fn rule_target(directory: &Path, key: &str) -> PathBuf {
    if key == "." {
        return directory.to_path_buf();
    }
    let relative = key.replace('\\', "/");
    normalize_path(&directory.join(relative.trim_end_matches('/')))
}

/// Top-level entries of a rule document in file order. A repeated key is an error.
struct RuleEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for RuleEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RuleEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping paths to rules")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RuleEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = BTreeSet::new();
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    if !seen.insert(key.clone()) {
                        return Err(de::Error::custom(format!("duplicate rule key \"{key}\"")));
                    }
                    entries.push((key, value));
                }
                Ok(RuleEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// The text of one rule document and the directory it lives in.
#[derive(Debug, Clone)]
pub struct RuleDocument {
    pub directory: PathBuf,
    pub text: String,
}

impl RuleDocument {
    /// Read a rule document from disk; its directory is the file's parent.
    pub fn read(path: &Path) -> Result<Self, RuleError> {
        let text = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            directory: path.parent().map(normalize_path).unwrap_or_default(),
            text,
        })
    }

    fn parse(&self, destinations: &Destinations) -> Result<Vec<Rule>, RuleError> {
        let directory = normalize_path(&self.directory);
        let RuleEntries(entries) =
            serde_json::from_str(&self.text).map_err(|source| RuleError::Document {
                directory: directory.clone(),
                source,
            })?;
        entries
            .into_iter()
            .map(|(key, value)| Rule::parse(&directory, &key, value, destinations))
            .collect()
    }
}

/// All rules of a run, grouped by document directory and pre-sorted by precedence.
///
/// Directories are ordered by depth (component count), ties broken by path,
/// so deeper documents apply later and have the final say. Built once and
/// never mutated.
#[derive(Debug, Default)]
pub struct RuleIndex {
    documents: Vec<(PathBuf, Vec<Rule>)>,
}

impl RuleIndex {
    /// Parse and validate every document. The first invalid rule fails the build.
    pub fn build(
        documents: impl IntoIterator<Item = RuleDocument>,
        destinations: &Destinations,
    ) -> Result<Self, RuleError> {
        let mut by_directory: BTreeMap<PathBuf, Vec<Rule>> = BTreeMap::new();
        for document in documents {
            let rules = document.parse(destinations)?;
            by_directory
                .entry(normalize_path(&document.directory))
                .or_default()
                .extend(rules);
        }

        let mut documents: Vec<(PathBuf, Vec<Rule>)> = by_directory.into_iter().collect();
        for (_, rules) in &mut documents {
            rules.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }
        documents.sort_by(|(a, _), (b, _)| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        });

        Ok(Self { documents })
    }

    /// Rules that govern `image`, in the order they must be applied.
    pub fn applicable<'a>(&'a self, image: &'a ImageSource) -> impl Iterator<Item = &'a Rule> {
        self.documents
            .iter()
            .filter(|(directory, _)| image.path.starts_with(directory))
            .flat_map(|(_, rules)| rules.iter())
            .filter(|rule| rule.applies_to(image))
    }

    /// Document directories in precedence order.
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.documents.iter().map(|(d, _)| d.as_path())
    }

    /// Total number of rules across all documents.
    pub fn rule_count(&self) -> usize {
        self.documents.iter().map(|(_, rules)| rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}
