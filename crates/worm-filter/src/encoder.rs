//! Writes verbose dumps and response lines to the walker's pipe.

use std::io::{self, Write};

use worm_protocol::{DomainInfo, ResponseRecord};

use crate::dump::{self, Breakdown};

/// How much the encoder prints ahead of each response line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Response lines only.
    #[default]
    Silent,
    /// Compact record dump plus breakdown.
    Raw,
    /// Indented, key-sorted record dump plus breakdown.
    Pretty,
}

impl Verbosity {
    /// Maps a `-v` count to a level; counts above two saturate.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Silent,
            1 => Self::Raw,
            _ => Self::Pretty,
        }
    }
}

/// Line-oriented writer for the response stream.
///
/// Every response line is flushed immediately: the walker blocks on each
/// answer before sending the next request.
pub struct ResponseEncoder<W> {
    out: W,
    verbosity: Verbosity,
}

impl<W: Write> ResponseEncoder<W> {
    /// Creates an encoder.
    #[must_use]
    pub const fn new(out: W, verbosity: Verbosity) -> Self {
        Self { out, verbosity }
    }

    /// Prints the provider record when verbose.
    ///
    /// # Errors
    ///
    /// Returns an error when writing fails.
    pub fn write_raw(&mut self, info: &DomainInfo) -> io::Result<()> {
        let rendered = match self.verbosity {
            Verbosity::Silent => return Ok(()),
            Verbosity::Raw => dump::raw_compact(info)?,
            Verbosity::Pretty => dump::raw_pretty(info)?,
        };
        writeln!(self.out, "{rendered}")
    }

    /// Prints the field breakdown when verbose.
    ///
    /// # Errors
    ///
    /// Returns an error when writing fails.
    pub fn write_breakdown(&mut self, breakdown: &Breakdown<'_>) -> io::Result<()> {
        if self.verbosity == Verbosity::Silent {
            return Ok(());
        }
        writeln!(self.out)?;
        self.out
            .write_all(dump::render_breakdown(breakdown).as_bytes())
    }

    /// Writes one response line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error when writing or flushing fails.
    pub fn write_record(&mut self, record: &ResponseRecord) -> io::Result<()> {
        writeln!(self.out, "{record}")?;
        self.out.flush()
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}
