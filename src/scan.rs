//! Source tree discovery.
//!
//! Walks the source folder once and collects two things:
//!
//! - **Rule documents**: every file named like `rule_file_name` (default
//!   `_config.json`), read and validated into a [`RuleIndex`].
//! - **Candidate images**: every file with a supported raster extension
//!   (`png`, `jpg`, `jpeg`, any case).
//!
//! ```text
//! artwork/                       # source_folder
//! ├── _config.json               # rules for the whole tree
//! ├── masks/face.png             # mask assets are ordinary images too
//! └── clubs/
//!     ├── _config.json           # rules for clubs/ and below
//!     ├── england/
//!     │   ├── arsenal.png
//!     │   └── chelsea.jpg
//!     └── spain/
//!         └── barcelona.png
//! ```
//!
//! Entries are visited in file-name order so every run sees the same list.
//! Images that no rule routes to a destination simply produce no output.

use crate::destination::Destinations;
use crate::imaging::rust_backend::is_supported_image;
use crate::rules::{RuleDocument, RuleError, RuleIndex};
use crate::types::ImageSource;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source folder not found: {0}")]
    MissingSource(PathBuf),
    #[error("Cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error(transparent)]
    Rules(#[from] RuleError),
}

/// Files found under the source folder.
#[derive(Debug, Default)]
pub struct Discovery {
    pub rule_files: Vec<PathBuf>,
    pub images: Vec<ImageSource>,
}

/// Result of the scan stage: every candidate image plus the validated rules.
#[derive(Debug)]
pub struct Scan {
    pub images: Vec<ImageSource>,
    pub rules: RuleIndex,
}

/// Walk `source_folder` for rule documents and supported images.
pub fn discover(source_folder: &Path, rule_file_name: &str) -> Result<Discovery, ScanError> {
    if !source_folder.is_dir() {
        return Err(ScanError::MissingSource(source_folder.to_path_buf()));
    }

    let mut discovery = Discovery::default();
    for entry in WalkDir::new(source_folder).sort_by_file_name() {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source_folder.to_path_buf()),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.file_name().is_some_and(|n| n == rule_file_name) {
            discovery.rule_files.push(path.to_path_buf());
        } else if is_supported_image(path) {
            if let Some(image) = ImageSource::from_path(path) {
                discovery.images.push(image);
            }
        }
    }

    debug!(
        rule_files = discovery.rule_files.len(),
        images = discovery.images.len(),
        "discovered source tree"
    );
    Ok(discovery)
}

/// Read and validate every discovered rule document.
pub fn load_rules(rule_files: &[PathBuf], destinations: &Destinations) -> Result<RuleIndex, ScanError> {
    let documents = rule_files
        .iter()
        .map(|path| RuleDocument::read(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleIndex::build(documents, destinations)?)
}

/// Discover the source tree and build its rule index.
pub fn scan(
    source_folder: &Path,
    rule_file_name: &str,
    destinations: &Destinations,
) -> Result<Scan, ScanError> {
    let discovery = discover(source_folder, rule_file_name)?;
    let rules = load_rules(&discovery.rule_files, destinations)?;
    Ok(Scan {
        images: discovery.images,
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{registry, spec, write_file, write_jpg, write_png};
    use tempfile::TempDir;

    fn setup_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_file(&root.join("_config.json"), r#"{".": {"include": ["logos"]}}"#);
        write_png(&root.join("clubs/england/arsenal.png"), 4, 4);
        write_jpg(&root.join("clubs/england/chelsea.JPG"), 4, 4);
        write_png(&root.join("clubs/spain/barcelona.png"), 4, 4);
        write_file(&root.join("clubs/spain/_config.json"), r#"{"barcelona": {"save_as": "1"}}"#);
        write_file(&root.join("clubs/notes.txt"), "not an image");
        tmp
    }

    #[test]
    fn discover_finds_rules_and_images_in_name_order() {
        let tmp = setup_tree();
        let found = discover(tmp.path(), "_config.json").unwrap();

        assert_eq!(
            found.rule_files,
            vec![
                tmp.path().join("_config.json"),
                tmp.path().join("clubs/spain/_config.json"),
            ]
        );
        let stems: Vec<&str> = found.images.iter().map(|i| i.stem.as_str()).collect();
        assert_eq!(stems, vec!["arsenal", "chelsea", "barcelona"]);
    }

    #[test]
    fn discover_lowercases_extensions() {
        let tmp = setup_tree();
        let found = discover(tmp.path(), "_config.json").unwrap();
        let chelsea = found.images.iter().find(|i| i.stem == "chelsea").unwrap();
        assert_eq!(chelsea.extension, "jpg");
    }

    #[test]
    fn custom_rule_file_name() {
        let tmp = setup_tree();
        write_file(&tmp.path().join("clubs/rules.json"), "{}");
        let found = discover(tmp.path(), "rules.json").unwrap();
        assert_eq!(found.rule_files, vec![tmp.path().join("clubs/rules.json")]);
    }

    #[test]
    fn missing_source_folder_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("nope"), "_config.json");
        assert!(matches!(result, Err(ScanError::MissingSource(_))));
    }

    #[test]
    fn scan_builds_rule_index() {
        let tmp = setup_tree();
        let destinations = registry([spec("logos", 8, 8)]);
        let scan = scan(tmp.path(), "_config.json", &destinations).unwrap();
        assert_eq!(scan.images.len(), 3);
        assert_eq!(scan.rules.rule_count(), 2);
    }

    #[test]
    fn scan_surfaces_rule_errors() {
        let tmp = setup_tree();
        let destinations = registry([spec("faces", 8, 8)]);
        let result = scan(tmp.path(), "_config.json", &destinations);
        assert!(matches!(
            result,
            Err(ScanError::Rules(RuleError::UnknownDestination { .. }))
        ));
    }

    #[test]
    fn scan_rejects_malformed_rule_document() {
        let tmp = setup_tree();
        write_file(&tmp.path().join("clubs/_config.json"), "{ broken");
        let destinations = registry([spec("logos", 8, 8)]);
        let result = scan(tmp.path(), "_config.json", &destinations);
        assert!(matches!(result, Err(ScanError::Rules(RuleError::Document { .. }))));
    }
}
