//! Cascade resolution: from applicable rules to one effective config per image.
//!
//! Resolution is a fold over the rules that govern an image, in the order
//! the [`RuleIndex`] keeps them (shallow documents first, folder rules before
//! file rules within a document). Each step returns a new state value; nothing
//! is shared between images and no rule is ever mutated.
//!
//! ## Merge semantics
//!
//! | Field | Rule leaves it unset | Rule sets it |
//! |---|---|---|
//! | `ignore`, crop anchor axes | inherited | overwritten |
//! | `save_as`, `folder` | inherited | overwritten; `""` resets to the derived default |
//! | `duplicates` | inherited | replaced wholesale (`[]` clears) |
//! | destinations | inherited | `override` replaces; `include` adds, then `exclude` removes |
//!
//! Excluding a destination that is not in the inherited set means two rules
//! in the cascade disagree; that is a hard [`ResolveError`].

use crate::imaging::CropAnchor;
use crate::naming::{FOLDER_PLACEHOLDER, substitute_folder};
use crate::rules::{DestinationChange, Rule, RuleIndex};
use crate::types::{DestinationId, ImageSource};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ResolveError {
    #[error(
        "Rule '{key}' in {directory} excludes '{destination}' from {image}, \
         but the destination is not in the inherited set"
    )]
    CascadeContradiction {
        image: PathBuf,
        directory: PathBuf,
        key: String,
        destination: DestinationId,
    },
}

/// Fully merged configuration for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub ignore: bool,
    pub crop_anchor: CropAnchor,
    /// Output base name (no extension).
    pub save_as: String,
    /// Folder name substituted into destination `{folder}` placeholders.
    pub folder: String,
    /// Extra output base names written next to `save_as`.
    pub duplicates: BTreeSet<String>,
    pub destinations: BTreeSet<DestinationId>,
}

impl EffectiveConfig {
    /// Every output base name: `duplicates ∪ {save_as}`, sorted.
    pub fn output_names(&self) -> BTreeSet<&str> {
        self.duplicates
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.save_as.as_str()))
            .collect()
    }
}

/// Intermediate fold state. `None` names mean "derive from the image".
#[derive(Debug, Clone, Default)]
struct Cascade {
    ignore: bool,
    crop_anchor: CropAnchor,
    save_as: Option<String>,
    folder: Option<String>,
    duplicates: BTreeSet<String>,
    destinations: BTreeSet<DestinationId>,
}

impl Cascade {
    fn apply(mut self, rule: &Rule, image: &ImageSource) -> Result<Self, ResolveError> {
        debug!(image = %image.path.display(), directory = %rule.directory.display(), key = %rule.key, "applying rule");

        if let Some(ignore) = rule.ignore {
            self.ignore = ignore;
        }
        if let Some(x) = rule.crop_anchor_x {
            self.crop_anchor.x = x;
        }
        if let Some(y) = rule.crop_anchor_y {
            self.crop_anchor.y = y;
        }
        if let Some(save_as) = &rule.save_as {
            self.save_as = non_empty(save_as);
        }
        if let Some(folder) = &rule.folder {
            self.folder = non_empty(folder);
        }
        if let Some(duplicates) = &rule.duplicates {
            self.duplicates = duplicates.clone();
        }

        match &rule.destinations {
            DestinationChange::Override(set) => self.destinations = set.clone(),
            DestinationChange::Adjust { include, exclude } => {
                self.destinations.extend(include.iter().cloned());
                for destination in exclude {
                    if !self.destinations.remove(destination) {
                        return Err(ResolveError::CascadeContradiction {
                            image: image.path.clone(),
                            directory: rule.directory.clone(),
                            key: rule.key.clone(),
                            destination: destination.clone(),
                        });
                    }
                }
            }
        }

        Ok(self)
    }

    fn finish(self, image: &ImageSource) -> EffectiveConfig {
        let folder_template = self.folder.as_deref().unwrap_or(FOLDER_PLACEHOLDER);
        EffectiveConfig {
            ignore: self.ignore,
            crop_anchor: self.crop_anchor,
            save_as: self.save_as.unwrap_or_else(|| image.stem.clone()),
            folder: substitute_folder(folder_template, &image.folder_name()),
            duplicates: self.duplicates,
            destinations: self.destinations,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Resolve the effective config of one image.
pub fn resolve(index: &RuleIndex, image: &ImageSource) -> Result<EffectiveConfig, ResolveError> {
    let cascade = index
        .applicable(image)
        .try_fold(Cascade::default(), |state, rule| state.apply(rule, image))?;
    Ok(cascade.finish(image))
}

/// An image paired with its resolved config.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub source: ImageSource,
    pub config: EffectiveConfig,
}

/// Resolve every image, stopping at the first contradiction.
pub fn resolve_all(
    index: &RuleIndex,
    images: &[ImageSource],
) -> Result<Vec<ResolvedImage>, ResolveError> {
    images
        .iter()
        .map(|image| {
            resolve(index, image).map(|config| ResolvedImage {
                source: image.clone(),
                config,
            })
        })
        .collect()
}
