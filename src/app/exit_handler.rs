//! Exit code logic for the export process.
//!
//! Single responsibility: map a finished run summary to the process exit outcome.

use ecotaxa_export::RunSummary;

use crate::ProcessExit;

/// Determines the process exit outcome from a run summary.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.interrupted {
        ProcessExit::Interrupted
    } else if summary.abandoned.is_empty() {
        ProcessExit::Success
    } else if !summary.fetched.is_empty() {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
