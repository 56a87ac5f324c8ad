//! Job status polling.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::error::PollError;
use super::model::{ExportJob, JobId, JobStatus};
use crate::markup;
use crate::session::EcotaxaSession;

/// Task listing page with one row per task of the session's user.
const TASK_LIST_PATH: &str = "/Task/listall";

/// Reads the current server-side status of outstanding jobs.
#[async_trait]
pub trait JobStatusPoller: Send + Sync {
    /// Classifies every job in `jobs`.
    ///
    /// Implementations issue one listing request per call. Jobs the listing
    /// does not mention are reported `Pending`.
    async fn poll(&self, jobs: &[ExportJob]) -> Result<HashMap<JobId, JobStatus>, PollError>;
}

/// Classifies `jobs` from one task listing page.
#[must_use]
pub fn classify_listing(listing: &str, jobs: &[ExportJob]) -> HashMap<JobId, JobStatus> {
    jobs.iter()
        .map(|job| (job.job, markup::task_status(listing, job.job)))
        .collect()
}

#[async_trait]
impl JobStatusPoller for EcotaxaSession {
    #[instrument(skip_all, fields(count = jobs.len()))]
    async fn poll(&self, jobs: &[ExportJob]) -> Result<HashMap<JobId, JobStatus>, PollError> {
        let listing = self.get_html(TASK_LIST_PATH).await?;
        let statuses = classify_listing(&listing, jobs);
        for job in jobs {
            debug!(
                dataset = %job.dataset,
                job = %job.job,
                status = %statuses.get(&job.job).copied().unwrap_or(JobStatus::Pending),
                "Pinging project status"
            );
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DatasetId;

    #[test]
    fn test_classify_listing_covers_every_job() {
        let listing = r#"
            <a href="/Task/Show/101">101</a><a href="/Task/Show/101">Done</a>
            <a href="/Task/Show/103">103</a><a href="/Task/Show/103">Error</a>
        "#;
        let jobs = [
            ExportJob::submitted(DatasetId(5), JobId(101)),
            ExportJob::submitted(DatasetId(7), JobId(102)),
            ExportJob::submitted(DatasetId(12), JobId(103)),
        ];
        let statuses = classify_listing(listing, &jobs);
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[&JobId(101)], JobStatus::Complete);
        assert_eq!(statuses[&JobId(102)], JobStatus::Pending);
        assert_eq!(statuses[&JobId(103)], JobStatus::Failed);
    }
}
