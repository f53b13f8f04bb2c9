//! Audits pathnames read one per line.
//!
//! Directories and paths that cannot be `lstat`-ed are skipped; every other
//! path produces exactly one audit line, including when its lookup failed.

use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coprocess::{CoprocessError, ResponseSource};
use crate::record::{AuditRecord, ObjectStat};

const DRIVER_TARGET: &str = "worm_audit::driver";

/// Errors that stop an audit.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Reading pathnames failed.
    #[error("failed to read pathname: {0}")]
    Read(#[source] io::Error),
    /// Writing an audit line failed.
    #[error("failed to write audit line: {0}")]
    Write(#[source] io::Error),
    /// The filter could not answer.
    #[error(transparent)]
    Coprocess(#[from] CoprocessError),
}

/// Counters reported when the audit ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Audit lines written.
    pub files: u64,
    /// Lines whose lookup returned a failure response.
    pub lookup_errors: u64,
    /// Directories and unreadable paths.
    pub skipped: u64,
}

/// Writes one audit line per file to `output`.
pub struct AuditSession<S, W> {
    source: S,
    output: W,
    summary: AuditSummary,
}

impl<S, W> AuditSession<S, W>
where
    S: ResponseSource,
    W: Write,
{
    /// Creates a session answering lookups from `source`.
    #[must_use]
    pub const fn new(source: S, output: W) -> Self {
        Self {
            source,
            output,
            summary: AuditSummary {
                files: 0,
                lookup_errors: 0,
                skipped: 0,
            },
        }
    }

    /// Audits every pathname in `input` until end of input.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when input or output fails, or when the
    /// filter cannot answer.
    pub fn audit<R: BufRead>(&mut self, input: &mut R) -> Result<AuditSummary, AuditError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let bytes_read = input
                .read_until(b'\n', &mut line)
                .map_err(AuditError::Read)?;
            if bytes_read == 0 {
                break;
            }
            if let Some(path) = path_from_line(&line) {
                self.audit_path(path)?;
            }
        }
        self.output.flush().map_err(AuditError::Write)?;

        let summary = self.summary;
        info!(
            target: DRIVER_TARGET,
            files = summary.files,
            lookup_errors = summary.lookup_errors,
            skipped = summary.skipped,
            "audit finished"
        );
        Ok(summary)
    }

    /// Audits a single pathname.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the line cannot be written or the filter
    /// cannot answer.
    pub fn audit_path(&mut self, path: &Path) -> Result<(), AuditError> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(target: DRIVER_TARGET, path = %path.display(), %error, "skipping unreadable path");
                self.summary.skipped += 1;
                return Ok(());
            }
        };
        if metadata.is_dir() {
            debug!(target: DRIVER_TARGET, path = %path.display(), "skipping directory");
            self.summary.skipped += 1;
            return Ok(());
        }

        let stat = ObjectStat::from_metadata(&metadata);
        let response = self.source.query(stat.object_handle())?;
        if response.failure_kind().is_some() {
            debug!(target: DRIVER_TARGET, path = %path.display(), %response, "lookup failed");
            self.summary.lookup_errors += 1;
        }

        let record = AuditRecord::new(path, &stat, &response);
        writeln!(self.output, "{record}").map_err(AuditError::Write)?;
        self.summary.files += 1;
        Ok(())
    }
}

/// Strips the line terminator; blank lines carry no path.
fn path_from_line(line: &[u8]) -> Option<&Path> {
    let unterminated = line.strip_suffix(b"\n").unwrap_or(line);
    let bare = unterminated.strip_suffix(b"\r").unwrap_or(unterminated);
    if bare.is_empty() {
        return None;
    }
    Some(Path::new(OsStr::from_bytes(bare)))
}

#[cfg(test)]
mod tests;
