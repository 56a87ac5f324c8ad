//! Retrieval of completed export artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::archive::unpack_zip_blocking;
use super::error::{FetchError, LayoutError};
use super::layout::{dataset_directory, sanitize_component};
use super::model::{ExportJob, JobId};
use crate::markup;
use crate::session::{EcotaxaSession, SessionError};

/// Downloads and unpacks the artifact of a completed job.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    /// Fetches `job` into a new directory under `destination` and returns it.
    ///
    /// On failure no partially created directory is left behind, and the
    /// caller's pending bookkeeping is untouched.
    async fn fetch(&self, job: &ExportJob, destination: &Path) -> Result<PathBuf, FetchError>;
}

fn show_task_path(job: JobId) -> String {
    format!("/Task/Show/{job}")
}

fn get_file_path(job: JobId, file_name: &str) -> String {
    format!("/Task/GetFile/{job}/{file_name}")
}

fn clean_task_path(job: JobId) -> String {
    format!("/Task/Clean/{job}")
}

#[async_trait]
impl ResultFetcher for EcotaxaSession {
    #[instrument(skip_all, fields(dataset = %job.dataset, task = %job.job))]
    async fn fetch(&self, job: &ExportJob, destination: &Path) -> Result<PathBuf, FetchError> {
        let page = self
            .get_html(&show_task_path(job.job))
            .await
            .map_err(|e| FetchError::request(job.job, e))?;
        let display_name = markup::dataset_display_name(&page, job.dataset).ok_or(
            FetchError::MissingMarkup {
                job: job.job,
                fragment: "project name",
            },
        )?;
        let file_name = markup::artifact_file_name(&page).ok_or(FetchError::MissingMarkup {
            job: job.job,
            fragment: "artifact link",
        })?;

        let dir = dataset_directory(destination, &display_name)?;
        create_dataset_directory(&dir).await?;

        if let Err(error) = self.download_and_unpack(job.job, &file_name, &dir).await {
            debug!(path = %dir.display(), "removing partial destination after error");
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                warn!(path = %dir.display(), error = %cleanup, "Failed to remove partial destination");
            }
            return Err(error);
        }
        info!(path = %dir.display(), "Download & extraction complete");

        match self.get(&clean_task_path(job.job)).await {
            Ok(_) => debug!("server task cleaned"),
            Err(error) => warn!(%error, "Failed to remove task from server; artifact is kept locally"),
        }

        Ok(dir)
    }
}

impl EcotaxaSession {
    async fn download_and_unpack(
        &self,
        job: JobId,
        file_name: &str,
        dir: &Path,
    ) -> Result<(), FetchError> {
        let archive_path = dir.join(sanitize_component(file_name));
        let response = self
            .get(&get_file_path(job, file_name))
            .await
            .map_err(|e| FetchError::request(job, e))?;

        let url = response.url().to_string();

        let mut file = File::create(&archive_path)
            .await
            .map_err(|e| FetchError::io(&archive_path, e))?;
        let bytes = stream_to_file(&mut file, response, job, &url, &archive_path).await?;
        drop(file);
        debug!(path = %archive_path.display(), bytes, "artifact downloaded");

        unpack_zip_blocking(archive_path.clone(), dir.to_path_buf()).await?;
        tokio::fs::remove_file(&archive_path)
            .await
            .map_err(|e| FetchError::io(&archive_path, e))?;
        Ok(())
    }
}

/// Creates the dataset directory, treating a concurrent creation as a collision.
async fn create_dataset_directory(dir: &Path) -> Result<(), FetchError> {
    match tokio::fs::create_dir(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(LayoutError {
            path: dir.to_path_buf(),
        }
        .into()),
        Err(e) => Err(FetchError::io(dir, e)),
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    job: JobId,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk =
            chunk_result.map_err(|e| FetchError::request(job, SessionError::from_reqwest(url, e)))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}
