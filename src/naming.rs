//! Centralized path and name handling.
//!
//! Every module that compares paths goes through these helpers so that rule
//! documents, destination identities, and discovered images agree on one
//! spelling of the same location.
//!
//! ## Lexical, never canonical
//!
//! Paths are normalized lexically: `.` components are dropped and `..`
//! collapses its parent. Nothing here touches the filesystem, so rules may
//! refer to files that do not exist yet and tests never need real trees.
//!
//! ## Destination identities
//!
//! Destinations are named by their path relative to the graphics folder.
//! Rule documents written on Windows use `\`, settings written elsewhere use
//! `/`; both normalize to the same `/`-joined identity:
//! - `"portraits/small/"` → `"portraits/small"`
//! - `".\\portraits\\small"` → `"portraits/small"`
//! - `"portraits/x/../small"` → `"portraits/small"`

use std::path::{Component, Path, PathBuf};

/// Placeholder replaced by the resolved folder name in folder templates.
pub const FOLDER_PLACEHOLDER: &str = "{folder}";

/// Normalize a path lexically (drop `.`, collapse `..`).
///
/// A `..` that would climb above the first component is kept, so relative
/// paths that point outside their base stay distinguishable.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize a destination path relative to the graphics folder into its identity string.
///
/// Accepts both `/` and `\` as separators regardless of platform.
pub fn normalize_destination(relative: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in relative.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(p) if *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Replace every `{folder}` placeholder in `template` with `folder`.
pub fn substitute_folder(template: &str, folder: &str) -> String {
    template.replace(FOLDER_PLACEHOLDER, folder)
}

/// Whether a rule key names a folder (`.` or a trailing separator).
pub fn is_folder_key(key: &str) -> bool {
    key == "." || key.ends_with('/') || key.ends_with('\\')
}

/// Final path component as a `String`, or empty when the path has none.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output file name for a base name and an extension without a leading dot.
pub fn output_file_name(name: &str, extension: &str) -> String {
    format!("{name}.{extension}")
}
