//! Unpacking of downloaded export artifacts.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::FetchError;

/// Extracts the zip archive at `archive_path` into `dest`.
///
/// Entries with paths escaping `dest` are rejected by the zip reader.
/// Returns the number of entries in the archive.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the archive cannot be opened and
/// [`FetchError::Archive`] if it is not a valid zip or extraction fails.
pub fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<usize, FetchError> {
    let file = File::open(archive_path).map_err(|e| FetchError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| FetchError::archive(archive_path, format!("failed to read ZIP archive: {e}")))?;

    let entries = archive.len();
    debug!(archive = %archive_path.display(), entries, "extracting");
    archive
        .extract(dest)
        .map_err(|e| FetchError::archive(archive_path, format!("extraction failed: {e}")))?;

    info!(
        archive = %archive_path.display(),
        extracted_count = entries,
        "ZIP extraction successful"
    );
    Ok(entries)
}

/// Runs [`unpack_zip`] on the blocking pool and waits for it.
///
/// # Errors
///
/// Returns the errors of [`unpack_zip`], or [`FetchError::Archive`] if the
/// blocking task panicked.
pub async fn unpack_zip_blocking(archive_path: PathBuf, dest: PathBuf) -> Result<usize, FetchError> {
    let archive_for_error = archive_path.clone();
    tokio::task::spawn_blocking(move || unpack_zip(&archive_path, &dest))
        .await
        .map_err(|e| FetchError::archive(archive_for_error, format!("extraction task failed: {e}")))?
}
