//! CLI output formatting for the check and build commands.
//!
//! # Image-First Display
//!
//! Every block leads with the source image (relative to the source folder),
//! followed by indented lines for what happens to it. Output paths are shown
//! relative to the graphics folder so the listing reads as an inventory of
//! the game's asset tree.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Images
//! clubs/england/arsenal.png
//!     logos/{folder} → logos/england/1.png, logos/england/gunners.png
//!     faces/{folder} → faces/england/1.png, faces/england/gunners.png
//! clubs/england/chelsea.jpg
//!     (no destinations)
//!
//! Ignored
//! clubs/retired/leeds.png
//!
//! 2 images, 4 outputs, 1 ignored
//! ```
//!
//! ## Build
//!
//! ```text
//! clubs/england/arsenal.png → 4 files
//! clubs/spain/barca.png FAILED: Failed to decode ...
//!
//! Wrote 4 files from 1 image (1 ignored, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::process::{Plan, ProcessEvent, ProcessResult, relative_to};
use std::path::Path;

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the planned outputs of a check run.
pub fn format_plan(plan: &Plan, source_root: &Path, graphics_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !plan.jobs.is_empty() {
        lines.push("Images".to_string());
    }
    for job in &plan.jobs {
        lines.push(relative_to(&job.source.path, source_root).display().to_string());
        if job.targets.is_empty() {
            lines.push("    (no destinations)".to_string());
        }
        for target in &job.targets {
            let files: Vec<String> = target
                .files
                .iter()
                .map(|f| relative_to(f, graphics_root).display().to_string())
                .collect();
            lines.push(format!(
                "    {} \u{2192} {}",
                target.destination,
                files.join(", ")
            ));
        }
    }

    if !plan.ignored.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Ignored".to_string());
        for path in &plan.ignored {
            lines.push(relative_to(path, source_root).display().to_string());
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{}, {}, {} ignored",
        plural(plan.jobs.len(), "image"),
        plural(plan.output_count(), "output"),
        plan.ignored.len()
    ));
    lines
}

/// Print the check plan to stdout.
pub fn print_plan(plan: &Plan, source_root: &Path, graphics_root: &Path) {
    for line in format_plan(plan, source_root, graphics_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent, source_root: &Path) -> Vec<String> {
    match event {
        ProcessEvent::ImageWritten { source, outputs } => vec![format!(
            "{} \u{2192} {}",
            relative_to(source, source_root).display(),
            plural(outputs.len(), "file")
        )],
        ProcessEvent::ImageFailed { source, error } => vec![format!(
            "{} FAILED: {}",
            relative_to(source, source_root).display(),
            error
        )],
    }
}

/// Format the closing summary of a build.
pub fn format_build_summary(result: &ProcessResult) -> Vec<String> {
    let mut extras = vec![format!("{} ignored", result.ignored)];
    if !result.failures.is_empty() {
        extras.push(format!("{} failed", result.failures.len()));
    }
    vec![format!(
        "Wrote {} from {} ({})",
        plural(result.output_count(), "file"),
        plural(result.written.len(), "image"),
        extras.join(", ")
    )]
}

/// Print the build summary to stdout.
pub fn print_build_summary(result: &ProcessResult) {
    for line in format_build_summary(result) {
        println!("{}", line);
    }
}
