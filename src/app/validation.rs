use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Checks the destination root before any network activity.
pub(crate) fn validate_destination(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!(
            "What: Destination path does not exist\nWhy: {} was not found\nFix: Create the directory first or pass an existing one with --path.",
            path.display()
        );
    }
    if !path.is_dir() {
        bail!(
            "What: Destination path is not a directory\nWhy: {} is a file\nFix: Pass a directory with --path.",
            path.display()
        );
    }
    Ok(path.to_path_buf())
}
