//! The lock-step request loop.
//!
//! One line is read, classified, resolved, and answered before the next is
//! read. Per-request failures become response lines; only I/O failures on
//! the walker's pipes end the session early.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, info};
use worm_protocol::{FailureKind, ObjectHandle, ResponseRecord};

use crate::classifier::{Request, classify_bytes};
use crate::clock::Clock;
use crate::dump::Breakdown;
use crate::encoder::{ResponseEncoder, Verbosity};
use crate::provider::DomainProvider;
use crate::resolver::{PathStat, Resolver, invalid_handle_failure, lstat};
use crate::shape::shape;

const SESSION_TARGET: &str = "worm_filter::session";

/// Whether the loop continues after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// A response was written; read the next line.
    Continue,
    /// The line terminated the session.
    Stop,
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from the walker failed.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),
    /// Writing to the walker failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
}

/// Counters reported when the session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Responses written.
    pub requests: u64,
    /// Failure responses by kind.
    pub failures: BTreeMap<FailureKind, u64>,
}

impl SessionSummary {
    fn record(&mut self, record: &ResponseRecord) {
        self.requests += 1;
        if let Some(kind) = record.failure_kind() {
            *self.failures.entry(kind).or_default() += 1;
        }
    }

    /// Total failure responses.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.values().sum()
    }
}

/// Serves requests read from the walker.
pub struct FilterSession<P, C, W> {
    resolver: Resolver<P, C>,
    encoder: ResponseEncoder<W>,
    summary: SessionSummary,
}

impl<P, C, W> FilterSession<P, C, W>
where
    P: DomainProvider,
    C: Clock,
    W: Write,
{
    /// Creates a session writing to `output`.
    #[must_use]
    pub const fn new(provider: P, clock: C, output: W, verbosity: Verbosity) -> Self {
        Self {
            resolver: Resolver::new(provider, clock),
            encoder: ResponseEncoder::new(output, verbosity),
            summary: SessionSummary {
                requests: 0,
                failures: BTreeMap::new(),
            },
        }
    }

    /// Answers lines until a terminator or end of input.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the input cannot be read or a response
    /// cannot be written.
    pub fn serve(&mut self, input: &mut impl BufRead) -> Result<&SessionSummary, SessionError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let bytes_read = input
                .read_until(b'\n', &mut line)
                .map_err(SessionError::Read)?;
            if bytes_read == 0 {
                debug!(target: SESSION_TARGET, "end of input");
                break;
            }
            if self.handle_line(&line).map_err(SessionError::Write)? == Flow::Stop {
                debug!(target: SESSION_TARGET, "terminator received");
                break;
            }
        }

        info!(
            target: SESSION_TARGET,
            requests = self.summary.requests,
            failures = self.summary.failure_count(),
            "session finished"
        );
        Ok(&self.summary)
    }

    /// Answers one raw input line.
    ///
    /// # Errors
    ///
    /// Returns an error when writing to the output fails.
    pub fn handle_line(&mut self, line: &[u8]) -> io::Result<Flow> {
        let (handle, stat) = match classify_bytes(line) {
            Request::Terminate => return Ok(Flow::Stop),
            Request::Handle(handle) => (handle, None),
            Request::InvalidHandle(text) => {
                self.respond(&invalid_handle_failure(&text))?;
                return Ok(Flow::Continue);
            }
            Request::Path(path) => match lstat(&path) {
                Ok(stat) => (stat.handle, Some(stat)),
                Err(record) => {
                    self.respond(&record)?;
                    return Ok(Flow::Continue);
                }
            },
        };

        let record = self.lookup(handle, stat.as_ref())?;
        self.respond(&record)?;
        Ok(Flow::Continue)
    }

    /// Returns the counters so far.
    #[must_use]
    pub const fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Returns the output writer.
    #[must_use]
    pub fn into_output(self) -> W {
        self.encoder.into_inner()
    }

    fn lookup(&mut self, handle: ObjectHandle, stat: Option<&PathStat>) -> io::Result<ResponseRecord> {
        let resolved = match self.resolver.resolve(handle) {
            Ok(resolved) => resolved,
            Err(record) => return Ok(record),
        };
        self.encoder.write_raw(&resolved.info)?;

        match shape(&resolved.info) {
            Ok(object) => {
                self.encoder.write_breakdown(&Breakdown {
                    handle,
                    ref_date: resolved.ref_date,
                    stat,
                    object: &object,
                })?;
                Ok(ResponseRecord::success(resolved.ref_date, object.fields()))
            }
            Err(rejection) => Ok(rejection),
        }
    }

    fn respond(&mut self, record: &ResponseRecord) -> io::Result<()> {
        debug!(target: SESSION_TARGET, response = %record, "answering request");
        self.summary.record(record);
        self.encoder.write_record(record)
    }
}
