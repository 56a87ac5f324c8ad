//! Data model shared by the export components.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Identifier of a remote dataset (an EcoTaxa project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DatasetId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a server-side export task, assigned at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side state of an export job as observed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Still running, queued, or not visible in the listing.
    Pending,
    /// The artifact is ready for download.
    Complete,
    /// The server reported the task as errored.
    Failed,
}

impl JobStatus {
    /// Returns the status as a lowercase string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One export job: the dataset it exports and the task that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportJob {
    /// Dataset being exported.
    pub dataset: DatasetId,
    /// Server task id.
    pub job: JobId,
    /// Last observed status.
    pub status: JobStatus,
}

impl ExportJob {
    /// Creates a freshly submitted job in the `Pending` state.
    #[must_use]
    pub fn submitted(dataset: DatasetId, job: JobId) -> Self {
        Self {
            dataset,
            job,
            status: JobStatus::Pending,
        }
    }
}

/// Output format requested from the export task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Tab-separated values.
    #[default]
    Tsv,
}

impl ExportFormat {
    /// Value sent in the `what` form field.
    #[must_use]
    pub fn form_value(self) -> &'static str {
        match self {
            Self::Tsv => "TSV",
        }
    }
}

/// Export parameters sent unchanged with every submission.
///
/// The shape is fixed: a format selector, a summary grouping option and an
/// optional split option. Field values are passed through to the service as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Format selector (`what`).
    pub format: ExportFormat,
    /// Summary grouping option (`sumsubtotal`).
    pub grouping: String,
    /// Optional split option (`splitcsvby`).
    pub split_by: Option<String>,
    /// Optional images DOI (`exportimagesdoi`).
    pub images_doi: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Tsv,
            grouping: "W".to_string(),
            split_by: None,
            images_doi: None,
        }
    }
}

impl ExportConfig {
    /// Sets the split option.
    #[must_use]
    pub fn with_split_by(mut self, split_by: impl Into<String>) -> Self {
        self.split_by = Some(split_by.into());
        self
    }

    /// Sets the summary grouping option.
    #[must_use]
    pub fn with_grouping(mut self, grouping: impl Into<String>) -> Self {
        self.grouping = grouping.into();
        self
    }

    /// Form fields for the task creation request, in submission order.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "exportimagesdoi",
                self.images_doi.clone().unwrap_or_default(),
            ),
            ("splitcsvby", self.split_by.clone().unwrap_or_default()),
            ("starttask", "Y".to_string()),
            ("sumsubtotal", self.grouping.clone()),
            ("what", self.format.form_value().to_string()),
        ]
    }
}

/// A dataset whose artifact was downloaded and unpacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedDataset {
    /// Dataset id.
    pub dataset: DatasetId,
    /// Task that produced the artifact.
    pub job: JobId,
    /// Directory holding the unpacked export.
    pub path: PathBuf,
}
