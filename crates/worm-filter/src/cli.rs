//! Command-line flags owned by the filter binary itself.

use clap::{ArgAction, Parser};

use crate::encoder::Verbosity;

/// WORM retention co-process filter.
///
/// Reads one LIN or pathname per line from stdin and answers each with one
/// `P ...` line on stdout. `-1`, a blank line, or end of input ends the
/// session.
#[derive(Parser, Debug)]
#[command(name = "worm-filter", version)]
pub(crate) struct Cli {
    /// Print the domain record before each response; repeat for the
    /// indented form.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

impl Cli {
    pub(crate) const fn verbosity(&self) -> Verbosity {
        Verbosity::from_count(self.verbose)
    }
}
