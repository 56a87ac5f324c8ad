//! CLI argument definitions using clap derive macros.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use ecotaxa_export::{
    DEFAULT_BASE_URL, DatasetSelection, OrchestratorConfig, SessionConfig,
    export::{DEFAULT_MAX_FETCH_ATTEMPTS, DEFAULT_MAX_POLLS},
};

/// Batch export of EcoTaxa project tables.
///
/// Logs in, submits one tabular export per selected project, waits for the
/// server tasks to finish, then downloads and unpacks every artifact into a
/// fresh `export_<timestamp>` folder under the destination path.
#[derive(Parser)]
#[command(name = "ecotaxa-export")]
#[command(author, version, about)]
pub struct Args {
    /// Account email used to log in
    #[arg(short, long)]
    pub user: String,

    /// Destination root; must be an existing directory
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Project ids to export (0 or none: every accessible project)
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    pub ids: Option<Vec<u64>>,

    /// Export options (accepted for compatibility; the tabular export is always requested)
    #[arg(short, long, num_args = 1..)]
    pub export: Option<Vec<String>>,

    /// Account password (prompted on stdin when absent)
    #[arg(long, env = "ECOTAXA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Service root
    #[arg(long, env = "ECOTAXA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Seconds between status polls (1-3600)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub poll_interval: u64,

    /// Failed download attempts tolerated per project (1-100)
    #[arg(long, default_value_t = DEFAULT_MAX_FETCH_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_fetch_attempts: u32,

    /// Polls a task may stay unfinished before it is abandoned (0 to wait forever)
    #[arg(long, default_value_t = DEFAULT_MAX_POLLS)]
    pub max_polls: u32,

    /// Overall deadline in seconds; unfinished tasks are reported as remaining
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("user", &self.user)
            .field("path", &self.path)
            .field("ids", &self.ids)
            .field("export", &self.export)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("insecure", &self.insecure)
            .field("poll_interval", &self.poll_interval)
            .field("max_fetch_attempts", &self.max_fetch_attempts)
            .field("max_polls", &self.max_polls)
            .field("timeout", &self.timeout)
            .field("json", &self.json)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish()
    }
}

impl Args {
    /// Log level used when `RUST_LOG` is unset.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    pub fn selection(&self) -> DatasetSelection {
        DatasetSelection::from_raw(self.ids.as_deref())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.base_url.clone()).with_accept_invalid_certs(self.insecure)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::default()
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_max_fetch_attempts(self.max_fetch_attempts)
            .with_max_polls((self.max_polls > 0).then_some(self.max_polls))
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
