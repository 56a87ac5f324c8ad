//! EcoTaxa Export Library
//!
//! This library drives bulk exports from an EcoTaxa instance: it logs in,
//! resolves the requested projects against what the account can see, submits
//! one export task per project, polls until the tasks finish, then downloads
//! and unpacks each artifact into a per-run folder.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - Authenticated HTTP session (cookie store, login)
//! - [`catalog`] - Project listing and selection resolution
//! - [`export`] - Job submission, status polling, artifact retrieval and the
//!   orchestration loop
//! - [`markup`] - Extraction of identifiers and statuses from service pages

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod export;
pub mod markup;
pub mod session;
mod user_agent;

// Re-export commonly used types
pub use catalog::{
    ALL_DATASETS_SENTINEL, DatasetSelection, Resolution, ResourceCatalog, resolve,
    resolve_selection,
};
pub use export::{
    DatasetId, ExportConfig, ExportJob, JobId, JobStatus, LoopControl, OrchestrationError,
    Orchestrator, OrchestratorConfig, RunSummary,
};
pub use session::{DEFAULT_BASE_URL, EcotaxaSession, SessionConfig, SessionError};
