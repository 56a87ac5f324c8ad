//! The polling state machine that drives export jobs to completion.
//!
//! # Overview
//!
//! [`Orchestrator::submit_all`] creates one job per resolved dataset and builds
//! the [`PendingSet`]; any submission failure aborts the run before anything is
//! polled. [`Orchestrator::drain`] then repeats passes until the set is empty:
//!
//! 1. poll every pending job with a single listing request,
//! 2. fetch each job reported complete, in pending order,
//! 3. pause a fixed interval if anything is left.
//!
//! A failed listing request skips step 2 and charges no job a poll.
//!
//! Per job: `Pending → Complete → Fetched`, or `Abandoned` when the server
//! reports a failure, the destination collides, fetching keeps failing, or the
//! job never completes within the poll cap.
//!
//! Every job ever submitted is in exactly one of pending, fetched or abandoned
//! at every step.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::control::LoopControl;
use super::error::{FetchError, OrchestrationError};
use super::fetcher::ResultFetcher;
use super::model::{DatasetId, ExportConfig, ExportJob, FetchedDataset, JobId, JobStatus};
use super::poller::JobStatusPoller;
use super::submitter::JobSubmitter;

/// Fixed pause between poll passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of failed fetch attempts before a job is abandoned.
pub const DEFAULT_MAX_FETCH_ATTEMPTS: u32 = 3;

/// Default number of passes a job may stay pending (one hour at 2 s).
pub const DEFAULT_MAX_POLLS: u32 = 1800;

/// Tuning for the orchestration loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Pause between passes.
    pub poll_interval: Duration,
    /// Failed fetch attempts tolerated per job (at least 1).
    pub max_fetch_attempts: u32,
    /// Passes a job may remain pending before it is abandoned; `None` waits forever.
    pub max_polls: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_fetch_attempts: DEFAULT_MAX_FETCH_ATTEMPTS,
            max_polls: Some(DEFAULT_MAX_POLLS),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the pause between passes.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the fetch attempt cap (clamped to at least 1).
    #[must_use]
    pub fn with_max_fetch_attempts(mut self, attempts: u32) -> Self {
        self.max_fetch_attempts = attempts.max(1);
        self
    }

    /// Sets the per-job poll cap.
    #[must_use]
    pub fn with_max_polls(mut self, polls: Option<u32>) -> Self {
        self.max_polls = polls;
        self
    }
}

#[derive(Debug, Clone)]
struct PendingEntry {
    job: ExportJob,
    polls: u32,
    fetch_failures: u32,
}

/// Ordered set of outstanding jobs, at most one per dataset.
///
/// Only the orchestrator mutates it; everyone else gets read access.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    entries: Vec<PendingEntry>,
}

impl PendingSet {
    /// Appends a job.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError::DuplicateDataset`] if the dataset already
    /// has an outstanding job.
    pub(crate) fn insert(&mut self, job: ExportJob) -> Result<(), OrchestrationError> {
        if self.entries.iter().any(|e| e.job.dataset == job.dataset) {
            return Err(OrchestrationError::DuplicateDataset {
                dataset: job.dataset,
            });
        }
        self.entries.push(PendingEntry {
            job,
            polls: 0,
            fetch_failures: 0,
        });
        Ok(())
    }

    /// Number of outstanding jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outstanding jobs in order.
    #[must_use]
    pub fn jobs(&self) -> Vec<ExportJob> {
        self.entries.iter().map(|e| e.job).collect()
    }

    /// True if `job` is outstanding.
    #[must_use]
    pub fn contains(&self, job: JobId) -> bool {
        self.entries.iter().any(|e| e.job.job == job)
    }

    fn get_mut(&mut self, job: JobId) -> Option<&mut PendingEntry> {
        self.entries.iter_mut().find(|e| e.job.job == job)
    }

    fn remove(&mut self, job: JobId) -> Option<PendingEntry> {
        let index = self.entries.iter().position(|e| e.job.job == job)?;
        Some(self.entries.remove(index))
    }
}

/// Why a job was given up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbandonReason {
    /// The server marked the task as errored.
    ServerFailed,
    /// The job stayed pending for the whole poll budget.
    PollLimit {
        /// Passes observed.
        polls: u32,
    },
    /// Fetching failed on every allowed attempt.
    FetchFailed {
        /// Attempts made.
        attempts: u32,
        /// Last error message.
        last_error: String,
    },
    /// The destination directory already existed.
    Layout {
        /// The colliding directory.
        path: PathBuf,
    },
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerFailed => write!(f, "server reported the task as failed"),
            Self::PollLimit { polls } => write!(f, "not complete after {polls} polls"),
            Self::FetchFailed {
                attempts,
                last_error,
            } => write!(f, "fetch failed {attempts} time(s): {last_error}"),
            Self::Layout { path } => write!(f, "{} already exists", path.display()),
        }
    }
}

/// A job removed from the pending set without being fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedJob {
    /// The job.
    pub job: ExportJob,
    /// Why it was abandoned.
    pub reason: AbandonReason,
}

/// Account of a finished (or interrupted) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Datasets downloaded and unpacked.
    pub fetched: Vec<FetchedDataset>,
    /// Jobs given up on.
    pub abandoned: Vec<AbandonedJob>,
    /// Jobs still outstanding; only non-empty when interrupted.
    pub remaining: Vec<ExportJob>,
    /// Poll passes performed.
    pub passes: u32,
    /// True if cancellation or the deadline stopped the loop.
    pub interrupted: bool,
}

impl RunSummary {
    /// Number of jobs the run accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.fetched.len() + self.abandoned.len() + self.remaining.len()
    }

    /// True when every submitted job was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.abandoned.is_empty() && self.remaining.is_empty()
    }
}

/// Drives export jobs from submission to local artifacts.
///
/// All work runs strictly in sequence; the only suspension point besides the
/// I/O calls themselves is the fixed pause between passes.
pub struct Orchestrator<'a> {
    submitter: &'a dyn JobSubmitter,
    poller: &'a dyn JobStatusPoller,
    fetcher: &'a dyn ResultFetcher,
    config: OrchestratorConfig,
}

impl fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator with the default configuration.
    #[must_use]
    pub fn new(
        submitter: &'a dyn JobSubmitter,
        poller: &'a dyn JobStatusPoller,
        fetcher: &'a dyn ResultFetcher,
    ) -> Self {
        Self {
            submitter,
            poller,
            fetcher,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Submits one job per dataset, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failure and returns
    /// [`OrchestrationError::Submission`] with the jobs created so far; later
    /// datasets are not submitted. Cancellation before a submission returns
    /// [`OrchestrationError::CancelledDuringSubmission`].
    #[instrument(skip_all, fields(datasets = datasets.len()))]
    pub async fn submit_all(
        &self,
        datasets: &[DatasetId],
        export: &ExportConfig,
        control: &LoopControl,
    ) -> Result<PendingSet, OrchestrationError> {
        let mut pending = PendingSet::default();
        for &dataset in datasets {
            if control.should_stop() {
                return Err(OrchestrationError::CancelledDuringSubmission {
                    submitted: pending.jobs(),
                });
            }
            let job = match self.submitter.submit(dataset, export).await {
                Ok(job) => job,
                Err(source) => {
                    return Err(OrchestrationError::Submission {
                        source,
                        submitted: pending.jobs(),
                    });
                }
            };
            info!(dataset = %dataset, job = %job, "Exporting project");
            pending.insert(ExportJob::submitted(dataset, job))?;
        }
        Ok(pending)
    }

    /// Polls and fetches until `pending` is empty or the run is stopped.
    #[instrument(skip_all, fields(jobs = pending.len(), destination = %destination.display()))]
    pub async fn drain(
        &self,
        mut pending: PendingSet,
        destination: &Path,
        control: &LoopControl,
    ) -> RunSummary {
        let submitted = pending.len();
        let mut summary = RunSummary::default();

        'passes: while !pending.is_empty() {
            debug_assert_eq!(
                pending.len() + summary.fetched.len() + summary.abandoned.len(),
                submitted
            );
            if control.should_stop() {
                summary.interrupted = true;
                break;
            }

            summary.passes += 1;
            info!(pass = summary.passes, pending = pending.len(), "Polling task status");
            match self.poller.poll(&pending.jobs()).await {
                Ok(statuses) => {
                    for job in pending.jobs() {
                        if control.should_stop() {
                            summary.interrupted = true;
                            break 'passes;
                        }
                        let status = statuses.get(&job.job).copied().unwrap_or(JobStatus::Pending);
                        self.advance(&mut pending, &mut summary, job, status, destination)
                            .await;
                    }
                }
                // Nothing was observed, so no job spends its poll budget.
                Err(error) => warn!(%error, "Status poll failed; retrying after the interval"),
            }

            if !pending.is_empty() && !control.pause(self.config.poll_interval).await {
                summary.interrupted = true;
                break;
            }
        }

        summary.remaining = pending.jobs();
        if summary.interrupted {
            warn!(
                remaining = summary.remaining.len(),
                "Interrupted with jobs still pending"
            );
        }
        info!(
            fetched = summary.fetched.len(),
            abandoned = summary.abandoned.len(),
            remaining = summary.remaining.len(),
            passes = summary.passes,
            "Export run finished"
        );
        summary
    }

    /// Submits every dataset, then drains the pending set.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`submit_all`](Self::submit_all); once polling
    /// starts, every outcome is reported through the [`RunSummary`].
    pub async fn run(
        &self,
        datasets: &[DatasetId],
        export: &ExportConfig,
        destination: &Path,
        control: &LoopControl,
    ) -> Result<RunSummary, OrchestrationError> {
        let pending = self.submit_all(datasets, export, control).await?;
        Ok(self.drain(pending, destination, control).await)
    }

    async fn advance(
        &self,
        pending: &mut PendingSet,
        summary: &mut RunSummary,
        job: ExportJob,
        status: JobStatus,
        destination: &Path,
    ) {
        let Some(entry) = pending.get_mut(job.job) else {
            return;
        };
        entry.job.status = status;
        entry.polls += 1;
        let polls = entry.polls;

        match status {
            JobStatus::Pending => {
                if self.config.max_polls.is_some_and(|max| polls >= max) {
                    warn!(dataset = %job.dataset, job = %job.job, polls, "Task never completed; giving up");
                    abandon(pending, summary, job.job, AbandonReason::PollLimit { polls });
                } else {
                    debug!(dataset = %job.dataset, job = %job.job, "Task still running");
                }
            }
            JobStatus::Failed => {
                warn!(dataset = %job.dataset, job = %job.job, "Server reported task failure");
                abandon(pending, summary, job.job, AbandonReason::ServerFailed);
            }
            JobStatus::Complete => {
                info!(dataset = %job.dataset, job = %job.job, "Task completed, downloading");
                let job = ExportJob {
                    status: JobStatus::Complete,
                    ..job
                };
                match self.fetcher.fetch(&job, destination).await {
                    Ok(path) => {
                        pending.remove(job.job);
                        summary.fetched.push(FetchedDataset {
                            dataset: job.dataset,
                            job: job.job,
                            path,
                        });
                    }
                    Err(FetchError::Layout(error)) => {
                        warn!(dataset = %job.dataset, job = %job.job, %error, "Skipping project");
                        abandon(
                            pending,
                            summary,
                            job.job,
                            AbandonReason::Layout { path: error.path },
                        );
                    }
                    Err(error) => self.record_fetch_failure(pending, summary, job, &error),
                }
            }
        }
    }

    fn record_fetch_failure(
        &self,
        pending: &mut PendingSet,
        summary: &mut RunSummary,
        job: ExportJob,
        error: &FetchError,
    ) {
        let Some(entry) = pending.get_mut(job.job) else {
            return;
        };
        entry.fetch_failures += 1;
        let attempts = entry.fetch_failures;
        let max = self.config.max_fetch_attempts;

        if attempts >= max {
            warn!(dataset = %job.dataset, job = %job.job, attempts, %error, "Fetch failed; abandoning");
            abandon(
                pending,
                summary,
                job.job,
                AbandonReason::FetchFailed {
                    attempts,
                    last_error: error.to_string(),
                },
            );
        } else {
            warn!(
                dataset = %job.dataset,
                job = %job.job,
                attempt = attempts,
                max_attempts = max,
                %error,
                "Fetch failed; retrying on next poll"
            );
        }
    }
}

fn abandon(pending: &mut PendingSet, summary: &mut RunSummary, job: JobId, reason: AbandonReason) {
    if let Some(entry) = pending.remove(job) {
        summary.abandoned.push(AbandonedJob {
            job: entry.job,
            reason,
        });
    }
}
