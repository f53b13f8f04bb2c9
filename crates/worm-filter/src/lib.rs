//! WORM retention co-process filter.
//!
//! The filter sits at the end of a tree-walking pipeline. For every line the
//! walker writes (a LIN, a pathname, or a terminator) it resolves the
//! object's SmartLock domain through a metadata provider and answers with
//! exactly one fixed-column line. The pieces run in order for each line:
//!
//! 1. [`classifier`] decides what the line asks for.
//! 2. [`resolver`] `lstat`s pathnames and queries the provider.
//! 3. [`shape`] rejects directory domains and non-WORM objects.
//! 4. [`encoder`] prints optional dumps and the response line.
//!
//! [`session::FilterSession`] drives that loop, and [`run`] wires it to
//! configuration, telemetry, and the process streams.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use worm_config::{Config, ConfigError};

pub mod args;
pub mod classifier;
mod cli;
pub mod clock;
pub mod dump;
pub mod encoder;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod shape;
pub mod telemetry;

use args::split_arguments;
use cli::Cli;
pub use clock::{Clock, SystemClock};
pub use encoder::Verbosity;
pub use provider::{DomainProvider, ProviderSetupError, build_provider};
pub use session::{FilterSession, SessionError, SessionSummary};
use telemetry::TelemetryError;

/// Fatal errors that stop the filter before or during a session.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The command line could not be parsed.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The configured provider could not be built.
    #[error("failed to start metadata provider: {0}")]
    Provider(#[from] ProviderSetupError),
    /// The walker's pipes failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Runs the filter with the given arguments and streams.
///
/// Per-request failures are answered in-band and never affect the exit
/// status. Configuration, telemetry, provider setup, and pipe failures are
/// reported on `stderr` with a failing status.
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    match execute(args, stdin, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(FilterError::CliUsage(error)) if !error.use_stderr() => {
            drop(write!(stdout, "{error}"));
            ExitCode::SUCCESS
        }
        Err(error) => {
            drop(writeln!(stderr, "worm-filter: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn execute<I, R, W>(args: I, stdin: &mut R, stdout: &mut W) -> Result<(), FilterError>
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&args);
    let cli = Cli::try_parse_from(split.cli_arguments.iter()).map_err(FilterError::CliUsage)?;
    let config = Config::load_validated_from(&split.config_arguments)?;
    telemetry::initialise(&config, "worm-filter")?;
    let provider = build_provider(&config)?;
    serve(provider, SystemClock, stdin, stdout, cli.verbosity())?;
    Ok(())
}

/// Serves one session with an explicit provider and clock.
///
/// # Errors
///
/// Returns [`SessionError`] when reading requests or writing responses
/// fails.
pub fn serve<P, C, R, W>(
    provider: P,
    clock: C,
    input: &mut R,
    output: W,
    verbosity: Verbosity,
) -> Result<SessionSummary, SessionError>
where
    P: DomainProvider,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let mut session = FilterSession::new(provider, clock, output, verbosity);
    session.serve(input).cloned()
}

#[cfg(test)]
mod tests;
