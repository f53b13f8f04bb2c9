//! Child `worm-filter` process driven in lock-step.
//!
//! [`FilterCoprocess`] writes one handle per line to the filter's stdin and
//! reads exactly one response line back. The filter is replaced after a
//! fixed number of lookups so a long walk never depends on one helper
//! interpreter for its whole run.

use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use worm_protocol::{ObjectHandle, ResponseParseError, ResponseRecord};

const COPROCESS_TARGET: &str = "worm_audit::coprocess";

/// Line that asks the filter to exit.
const TERMINATOR: &str = "-1";

/// Failures talking to the filter process.
#[derive(Debug, Clone, Error)]
pub enum CoprocessError {
    /// The filter could not be started.
    #[error("failed to spawn filter '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Writing to or reading from the filter failed.
    #[error("filter pipe failed: {source}")]
    Io {
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The filter closed its stdout before answering.
    #[error("filter exited before answering handle {handle}")]
    Closed {
        /// Handle left unanswered.
        handle: ObjectHandle,
    },
    /// The filter answered with a line that is not a response record.
    #[error("filter answered '{line}': {source}")]
    InvalidResponse {
        /// Offending line, without its terminator.
        line: String,
        /// Parse failure.
        #[source]
        source: ResponseParseError,
    },
}

impl CoprocessError {
    fn io(source: io::Error) -> Self {
        Self::Io {
            source: Arc::new(source),
        }
    }
}

/// Source of one response record per handle.
pub trait ResponseSource {
    /// Looks up the retention response for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`CoprocessError`] when no response could be obtained.
    fn query(&mut self, handle: ObjectHandle) -> Result<ResponseRecord, CoprocessError>;
}

impl<S: ResponseSource + ?Sized> ResponseSource for &mut S {
    fn query(&mut self, handle: ObjectHandle) -> Result<ResponseRecord, CoprocessError> {
        (**self).query(handle)
    }
}

/// Program and arguments used to start the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl FilterCommand {
    /// Runs `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn display_program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Lock-step client for a `worm-filter` child process.
pub struct FilterCoprocess {
    command: FilterCommand,
    rejuvenate_after: u64,
    running: Option<RunningFilter>,
    calls: u64,
    spawns: u64,
}

impl FilterCoprocess {
    /// Creates a client; the filter starts on the first query.
    ///
    /// A `rejuvenate_after` of 0 is treated as 1.
    #[must_use]
    pub fn new(command: FilterCommand, rejuvenate_after: u64) -> Self {
        Self {
            command,
            rejuvenate_after: rejuvenate_after.max(1),
            running: None,
            calls: 0,
            spawns: 0,
        }
    }

    /// Queries answered since construction.
    #[must_use]
    pub const fn calls(&self) -> u64 {
        self.calls
    }

    /// Filter processes started since construction.
    #[must_use]
    pub const fn spawns(&self) -> u64 {
        self.spawns
    }

    /// Returns true while a filter process is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Sends the terminator to a running filter and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`CoprocessError::Io`] when the filter cannot be told to
    /// stop or reaped.
    pub fn shutdown(&mut self) -> Result<(), CoprocessError> {
        match self.running.take() {
            Some(running) => running.stop(),
            None => Ok(()),
        }
    }

    fn ready_filter(&mut self) -> Result<&mut RunningFilter, CoprocessError> {
        if self
            .running
            .as_ref()
            .is_some_and(|running| running.calls >= self.rejuvenate_after)
        {
            debug!(
                target: COPROCESS_TARGET,
                after = self.rejuvenate_after,
                "rejuvenating filter"
            );
            self.shutdown()?;
        }

        let running = match self.running.take() {
            Some(running) => running,
            None => {
                let running = RunningFilter::spawn(&self.command)?;
                self.spawns += 1;
                running
            }
        };
        Ok(self.running.insert(running))
    }
}

impl ResponseSource for FilterCoprocess {
    fn query(&mut self, handle: ObjectHandle) -> Result<ResponseRecord, CoprocessError> {
        let result = self
            .ready_filter()
            .and_then(|running| running.exchange(handle));
        match result {
            Ok(record) => {
                self.calls += 1;
                Ok(record)
            }
            Err(error) => {
                if let Some(running) = self.running.take() {
                    warn!(target: COPROCESS_TARGET, %handle, %error, "discarding filter");
                    running.discard();
                }
                Err(error)
            }
        }
    }
}

impl Drop for FilterCoprocess {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            warn!(target: COPROCESS_TARGET, %error, "filter did not shut down cleanly");
        }
    }
}

struct RunningFilter {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    calls: u64,
}

impl RunningFilter {
    fn spawn(command: &FilterCommand) -> Result<Self, CoprocessError> {
        let program = command.display_program();
        debug!(target: COPROCESS_TARGET, program, "spawning filter");
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|error| CoprocessError::Spawn {
                program: program.clone(),
                source: Arc::new(error),
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            drop(child.kill());
            drop(child.wait());
            return Err(CoprocessError::Spawn {
                program,
                source: Arc::new(io::Error::other("filter pipes were not captured")),
            });
        };

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            calls: 0,
        })
    }

    fn exchange(&mut self, handle: ObjectHandle) -> Result<ResponseRecord, CoprocessError> {
        writeln!(self.stdin, "{handle}")
            .and_then(|()| self.stdin.flush())
            .map_err(CoprocessError::io)?;

        let mut line = String::new();
        let bytes_read = self
            .stdout
            .read_line(&mut line)
            .map_err(CoprocessError::io)?;
        if bytes_read == 0 {
            return Err(CoprocessError::Closed { handle });
        }
        self.calls += 1;

        let trimmed = line.trim_end_matches(['\n', '\r']);
        trimmed
            .parse::<ResponseRecord>()
            .map_err(|source| CoprocessError::InvalidResponse {
                line: trimmed.to_owned(),
                source,
            })
    }

    fn stop(self) -> Result<(), CoprocessError> {
        let Self {
            mut child,
            mut stdin,
            ..
        } = self;
        let sent = writeln!(stdin, "{TERMINATOR}").and_then(|()| stdin.flush());
        drop(stdin);
        let status = child.wait().map_err(CoprocessError::io)?;
        debug!(target: COPROCESS_TARGET, ?status, "filter exited");
        sent.map_err(CoprocessError::io)
    }

    fn discard(mut self) {
        drop(self.child.kill());
        drop(self.child.wait());
    }
}
