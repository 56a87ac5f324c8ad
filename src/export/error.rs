//! Error types for the export components.
//!
//! Each component has its own error so the orchestrator can apply the right
//! policy: submission errors abort the run, poll errors are retried on the next
//! pass, fetch errors are retried up to a cap, and layout errors abandon only
//! the affected job.

use std::path::PathBuf;

use thiserror::Error;

use super::model::{DatasetId, ExportJob, JobId};
use crate::session::SessionError;

/// Job creation failed for a dataset.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request itself failed.
    #[error("export request for project {dataset} failed: {source}")]
    Request {
        /// Dataset the export was requested for.
        dataset: DatasetId,
        /// Underlying session error.
        #[source]
        source: SessionError,
    },

    /// The acknowledgement page carried no task number.
    #[error(
        "export request for project {dataset} was not acknowledged (permission denied or project unavailable)"
    )]
    NotAcknowledged {
        /// Dataset the export was requested for.
        dataset: DatasetId,
    },
}

impl SubmissionError {
    /// Dataset the failed submission targeted.
    #[must_use]
    pub fn dataset(&self) -> DatasetId {
        match self {
            Self::Request { dataset, .. } | Self::NotAcknowledged { dataset } => *dataset,
        }
    }
}

/// The task listing could not be read.
#[derive(Debug, Error)]
#[error("failed to read task status listing: {source}")]
pub struct PollError {
    /// Underlying session error.
    #[source]
    pub source: SessionError,
}

impl From<SessionError> for PollError {
    fn from(source: SessionError) -> Self {
        Self { source }
    }
}

/// The destination directory for a dataset already exists.
#[derive(Debug, Error)]
#[error("destination {path} already exists; refusing to overwrite")]
pub struct LayoutError {
    /// The colliding directory.
    pub path: PathBuf,
}

/// Downloading or unpacking a completed job failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Destination name collision.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Reading the task page or downloading the artifact failed.
    #[error("download for task {job} failed: {source}")]
    Request {
        /// Task being fetched.
        job: JobId,
        /// Underlying session error.
        #[source]
        source: SessionError,
    },

    /// The task page lacked the display name or artifact link.
    #[error("task {job} page has no {fragment}")]
    MissingMarkup {
        /// Task being fetched.
        job: JobId,
        /// What was missing.
        fragment: &'static str,
    },

    /// File system error while writing or cleaning up.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact is not a readable archive.
    #[error("failed to unpack {archive}: {reason}")]
    Archive {
        /// Downloaded archive path.
        archive: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

impl FetchError {
    /// Creates a request error.
    pub fn request(job: JobId, source: SessionError) -> Self {
        Self::Request { job, source }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an archive error.
    pub fn archive(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Archive {
            archive: archive.into(),
            reason: reason.into(),
        }
    }
}

/// Run-level failures of the orchestration loop.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// A submission failed; the run was aborted before polling.
    #[error("{source}")]
    Submission {
        /// The failing submission.
        #[source]
        source: SubmissionError,
        /// Jobs already created on the server before the failure.
        submitted: Vec<ExportJob>,
    },

    /// The run was cancelled while jobs were still being submitted.
    #[error("cancelled during submission after {} job(s)", .submitted.len())]
    CancelledDuringSubmission {
        /// Jobs already created on the server.
        submitted: Vec<ExportJob>,
    },

    /// A dataset was submitted twice.
    #[error("project {dataset} already has an outstanding job")]
    DuplicateDataset {
        /// The repeated dataset.
        dataset: DatasetId,
    },
}
