//! CLI output formatting for the end-of-run summary.
//!
//! Logs go to stderr; stdout carries only this summary, as text or JSON.

use std::path::Path;

use anyhow::Result;
use ecotaxa_export::{DatasetId, RunSummary};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SummaryReport<'a> {
    run_folder: &'a Path,
    dropped: &'a [DatasetId],
    #[serde(flatten)]
    summary: &'a RunSummary,
}

/// Builds the text summary lines.
pub(crate) fn summary_lines(
    run_folder: &Path,
    dropped: &[DatasetId],
    summary: &RunSummary,
) -> Vec<String> {
    let mut lines = vec![format!("Export folder: {}", run_folder.display())];

    if !dropped.is_empty() {
        let ids: Vec<String> = dropped.iter().map(ToString::to_string).collect();
        lines.push(format!("Skipped unknown project ids: {}", ids.join(", ")));
    }

    lines.push(format!(
        "Fetched {} of {} project(s) in {} poll pass(es)",
        summary.fetched.len(),
        summary.total(),
        summary.passes
    ));
    for fetched in &summary.fetched {
        lines.push(format!(
            "  {} (task {}) -> {}",
            fetched.dataset,
            fetched.job,
            fetched.path.display()
        ));
    }

    if !summary.abandoned.is_empty() {
        lines.push(format!("Abandoned {} project(s):", summary.abandoned.len()));
        for abandoned in &summary.abandoned {
            lines.push(format!(
                "  {} (task {}): {}",
                abandoned.job.dataset, abandoned.job.job, abandoned.reason
            ));
        }
    }

    if !summary.remaining.is_empty() {
        lines.push(format!(
            "Interrupted with {} project(s) still pending:",
            summary.remaining.len()
        ));
        for job in &summary.remaining {
            lines.push(format!("  {} (task {})", job.dataset, job.job));
        }
    } else if summary.interrupted {
        lines.push("Interrupted.".to_string());
    }

    lines
}

/// Renders the summary as pretty JSON.
pub(crate) fn summary_json(
    run_folder: &Path,
    dropped: &[DatasetId],
    summary: &RunSummary,
) -> Result<String> {
    let report = SummaryReport {
        run_folder,
        dropped,
        summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Prints the summary to stdout.
pub(crate) fn print_summary(
    run_folder: &Path,
    dropped: &[DatasetId],
    summary: &RunSummary,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", summary_json(run_folder, dropped, summary)?);
    } else {
        for line in summary_lines(run_folder, dropped, summary) {
            println!("{line}");
        }
    }
    Ok(())
}
