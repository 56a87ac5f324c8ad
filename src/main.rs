//! CLI entry point for the EcoTaxa export tool.

use std::process::ExitCode;

mod app;
mod cli;
mod output;

/// Process outcome, one exit code per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every resolved project was fetched.
    Success,
    /// Unexpected error, or every job was abandoned.
    Failure,
    /// Some projects fetched, some abandoned.
    Partial,
    /// Destination path missing or not a directory.
    InvalidPath,
    /// Login rejected.
    Authentication,
    /// Nothing left to export after resolution.
    NoMatchingDataset,
    /// An export task could not be created.
    Submission,
    /// Ctrl-C or the overall deadline stopped the run.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 7,
            Self::InvalidPath => 3,
            Self::Authentication => 4,
            Self::NoMatchingDataset => 5,
            Self::Submission => 6,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_export().await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure.into()
        }
    }
}
