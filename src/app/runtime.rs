use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use ecotaxa_export::export::create_run_directory;
use ecotaxa_export::{
    EcotaxaSession, ExportConfig, LoopControl, OrchestrationError, Orchestrator,
    resolve_selection,
};
use tracing::{debug, info, warn};

use crate::app::{credentials, exit_handler, terminal, validation};
use crate::cli::Args;
use crate::{ProcessExit, output};

pub(crate) async fn run_export() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    terminal::init_tracing(args.default_log_level());

    debug!(?args, "CLI arguments parsed");
    info!("EcoTaxa export starting");

    let destination = match validation::validate_destination(&args.path) {
        Ok(path) => path,
        Err(error) => return Ok(report(ProcessExit::InvalidPath, &error)),
    };
    if let Some(options) = &args.export {
        info!(?options, "Export options received; the tabular export is always requested");
    }

    let password = credentials::resolve_password(&args)?;
    let session = EcotaxaSession::new(&args.session_config())?;
    if let Err(error) = session.login(&args.user, &password).await {
        if error.is_authentication() {
            return Ok(report(ProcessExit::Authentication, &anyhow::Error::from(error)));
        }
        return Err(error).context("log-in request failed");
    }

    let resolution = resolve_selection(&session, &args.selection())
        .await
        .context("failed to list accessible projects")?;
    if resolution.is_empty() {
        let error = anyhow::anyhow!(
            "What: No matching project\nWhy: none of the requested ids is accessible to {}\nFix: Check the ids on the project list page, or pass -i 0 for every project.",
            args.user
        );
        return Ok(report(ProcessExit::NoMatchingDataset, &error));
    }
    info!(
        projects = resolution.resolved.len(),
        dropped = resolution.dropped.len(),
        "Projects resolved"
    );

    let run_dir = create_run_directory(&destination, Local::now()).with_context(|| {
        format!("failed to create run folder under {}", destination.display())
    })?;
    info!(dir = %run_dir.display(), "Run folder ready");

    let mut control = LoopControl::new();
    if let Some(timeout) = args.deadline() {
        control = control.with_timeout(timeout);
    }
    let token = control.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let orchestrator =
        Orchestrator::new(&session, &session, &session).with_config(args.orchestrator_config());
    debug!(
        poll_interval = ?orchestrator.config().poll_interval,
        max_fetch_attempts = orchestrator.config().max_fetch_attempts,
        max_polls = ?orchestrator.config().max_polls,
        timeout_secs = ?args.timeout,
        "Orchestrator configured"
    );

    let summary = match orchestrator
        .run(&resolution.resolved, &ExportConfig::default(), &run_dir, &control)
        .await
    {
        Ok(summary) => summary,
        Err(OrchestrationError::Submission { source, submitted }) => {
            for job in &submitted {
                warn!(dataset = %job.dataset, job = %job.job, "Task left on the server");
            }
            return Ok(report(ProcessExit::Submission, &anyhow::Error::from(source)));
        }
        Err(OrchestrationError::CancelledDuringSubmission { submitted }) => {
            for job in &submitted {
                warn!(dataset = %job.dataset, job = %job.job, "Task left on the server");
            }
            warn!("Interrupted during submission");
            return Ok(ProcessExit::Interrupted);
        }
        Err(error) => return Err(error.into()),
    };

    output::print_summary(&run_dir, &resolution.dropped, &summary, args.json)?;
    Ok(exit_handler::determine_exit_outcome(&summary))
}

fn report(exit: ProcessExit, error: &anyhow::Error) -> ProcessExit {
    eprintln!("Error: {error:#}");
    exit
}
