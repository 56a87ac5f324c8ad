//! Destination directory layout.
//!
//! Every run writes into its own `export_<yymmdd>_<HHMMSS>` folder under the
//! destination root, and every fetched dataset gets one directory inside it,
//! named after the dataset's display name. Existing directories are never
//! reused.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use super::error::LayoutError;

/// Prefix of per-run folders.
const RUN_FOLDER_PREFIX: &str = "export_";

/// Upper bound on numeric suffixes tried for a run folder.
const MAX_RUN_FOLDER_SUFFIX: u32 = 1000;

/// Name of the run folder for a run started at `started`.
#[must_use]
pub fn run_folder_name(started: DateTime<Local>) -> String {
    format!("{RUN_FOLDER_PREFIX}{}", started.format("%y%m%d_%H%M%S"))
}

/// Creates a fresh run folder under `root`.
///
/// Two runs started within the same second get `_2`, `_3`, ... suffixes.
///
/// # Errors
///
/// Returns the underlying IO error if the folder cannot be created.
pub fn create_run_directory(root: &Path, started: DateTime<Local>) -> io::Result<PathBuf> {
    let base = run_folder_name(started);
    let mut candidate = root.join(&base);
    let mut suffix = 2;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => {
                debug!(path = %candidate.display(), "created run folder");
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_RUN_FOLDER_SUFFIX => {
                candidate = root.join(format!("{base}_{suffix}"));
                suffix += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Turns a display name into a single safe path component.
///
/// Separators, reserved and control characters become `_`; trailing dots and
/// spaces are trimmed; names that would resolve to the parent or current
/// directory are replaced.
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim().trim_end_matches(['.', ' ']);

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns the directory a dataset named `display_name` would be unpacked into.
///
/// # Errors
///
/// Returns [`LayoutError`] if anything already exists at that path.
pub fn dataset_directory(root: &Path, display_name: &str) -> Result<PathBuf, LayoutError> {
    let path = root.join(sanitize_component(display_name));
    if path.symlink_metadata().is_ok() {
        return Err(LayoutError { path });
    }
    Ok(path)
}
