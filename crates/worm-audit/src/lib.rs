//! Retention audit driver for the WORM co-process filter.
//!
//! `worm-audit` reads pathnames, `lstat`s each file, asks a child
//! `worm-filter` for the file's persisted retention state, and writes one
//! CSV line describing the retention in effect right now:
//!
//! - [`coprocess`] runs the filter in lock-step and replaces it
//!   periodically.
//! - [`retention`] derives effective autocommit and expiry dates.
//! - [`record`] renders the audit line and the column legend.
//! - [`driver`] ties those together for a stream of pathnames.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::info;
use worm_config::{Config, ConfigError};
use worm_filter::args::split_arguments;
use worm_filter::telemetry::{self, TelemetryError};

mod cli;
pub mod coprocess;
pub mod driver;
pub mod record;
pub mod retention;

use cli::{Cli, filter_arguments};
pub use coprocess::{CoprocessError, FilterCommand, FilterCoprocess, ResponseSource};
pub use driver::{AuditError, AuditSession, AuditSummary};
pub use record::{AuditRecord, LEGEND, ObjectStat};
pub use retention::{LockDomain, LockStatus, RetentionAssessment, RetentionBasis, evaluate};

const AUDIT_TARGET: &str = "worm_audit";

/// Fatal errors that stop the audit.
#[derive(Debug, Error)]
pub enum RunError {
    /// The command line could not be parsed.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The audit loop failed.
    #[error(transparent)]
    Audit(#[from] AuditError),
    /// The filter did not shut down cleanly.
    #[error(transparent)]
    Coprocess(#[from] CoprocessError),
    /// The legend could not be written.
    #[error("failed to write legend: {0}")]
    Legend(#[source] std::io::Error),
}

/// Runs the audit with the given arguments and streams.
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    match execute(args, stdin, stdout, stderr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::CliUsage(error)) if !error.use_stderr() => {
            drop(write!(stdout, "{error}"));
            ExitCode::SUCCESS
        }
        Err(error) => {
            drop(writeln!(stderr, "worm-audit: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn execute<I, R, W, E>(
    args: I,
    stdin: &mut R,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), RunError>
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&args);
    let cli = Cli::try_parse_from(split.cli_arguments.iter()).map_err(RunError::CliUsage)?;
    let config = Config::load_validated_from(&split.config_arguments)?;
    telemetry::initialise(&config, "worm-audit")?;

    if cli.legend {
        stderr
            .write_all(LEGEND.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(RunError::Legend)?;
    }

    let command = FilterCommand::new(config.filter_command())
        .args(filter_arguments(&split.config_arguments));
    let mut coprocess = FilterCoprocess::new(command, config.rejuvenate_after());
    let summary = AuditSession::new(&mut coprocess, stdout).audit(stdin)?;
    coprocess.shutdown()?;

    info!(
        target: AUDIT_TARGET,
        calls = coprocess.calls(),
        spawns = coprocess.spawns(),
        files = summary.files,
        lookup_errors = summary.lookup_errors,
        skipped = summary.skipped,
        "audit complete"
    );
    Ok(())
}
