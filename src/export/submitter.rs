//! Export job submission.

use async_trait::async_trait;
use tracing::{info, instrument};

use super::error::SubmissionError;
use super::model::{DatasetId, ExportConfig, JobId};
use crate::markup;
use crate::session::EcotaxaSession;

/// Creates an export job for one dataset.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Requests an export of `dataset` and returns the new job id.
    ///
    /// No retries happen here; the caller decides what a failure means.
    async fn submit(
        &self,
        dataset: DatasetId,
        config: &ExportConfig,
    ) -> Result<JobId, SubmissionError>;
}

/// Task creation endpoint for a dataset's tabular export.
fn create_task_path(dataset: DatasetId) -> String {
    format!("/Task/Create/TaskExportTxt?projid={dataset}")
}

#[async_trait]
impl JobSubmitter for EcotaxaSession {
    #[instrument(skip_all, fields(dataset = %dataset))]
    async fn submit(
        &self,
        dataset: DatasetId,
        config: &ExportConfig,
    ) -> Result<JobId, SubmissionError> {
        let page = self
            .post_form(&create_task_path(dataset), &config.form_fields())
            .await
            .map_err(|source| SubmissionError::Request { dataset, source })?;

        let job = markup::submitted_task_id(&page)
            .ok_or(SubmissionError::NotAcknowledged { dataset })?;
        info!(dataset = %dataset, job = %job, "Export task created");
        Ok(job)
    }
}
