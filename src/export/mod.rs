//! Export job pipeline: submission, status polling, artifact retrieval and the
//! loop that ties them together.
//!
//! # Architecture
//!
//! - [`JobSubmitter`] creates one server task per dataset
//! - [`JobStatusPoller`] classifies outstanding tasks from one listing request
//! - [`ResultFetcher`] downloads, unpacks and cleans up a completed task
//! - [`Orchestrator`] owns the [`PendingSet`] and drives the three above
//!
//! [`EcotaxaSession`](crate::session::EcotaxaSession) implements all three
//! traits; tests substitute scripted backends.

mod archive;
mod control;
mod error;
mod fetcher;
mod layout;
mod model;
mod orchestrator;
mod poller;
mod submitter;

pub use archive::{unpack_zip, unpack_zip_blocking};
pub use control::LoopControl;
pub use error::{FetchError, LayoutError, OrchestrationError, PollError, SubmissionError};
pub use fetcher::ResultFetcher;
pub use layout::{create_run_directory, dataset_directory, run_folder_name, sanitize_component};
pub use model::{
    DatasetId, ExportConfig, ExportFormat, ExportJob, FetchedDataset, JobId, JobStatus,
};
pub use orchestrator::{
    AbandonReason, AbandonedJob, DEFAULT_MAX_FETCH_ATTEMPTS, DEFAULT_MAX_POLLS,
    DEFAULT_POLL_INTERVAL, Orchestrator, OrchestratorConfig, PendingSet, RunSummary,
};
pub use poller::{JobStatusPoller, classify_listing};
pub use submitter::JobSubmitter;
