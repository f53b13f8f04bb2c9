//! Command-line flags owned by the audit binary itself.

use std::ffi::{OsStr, OsString};

use clap::Parser;

/// Flags the audit driver consumes instead of forwarding to its filter.
const DRIVER_ONLY_FLAGS: &[&str] = &["--filter-command", "--rejuvenate-after"];

/// Audits the WORM retention state of files named on stdin.
///
/// Writes one CSV line per file to stdout. Directories and paths that
/// cannot be `lstat`-ed are skipped.
#[derive(Parser, Debug)]
#[command(name = "worm-audit", version)]
pub(crate) struct Cli {
    /// Print the column key to stderr before auditing.
    #[arg(long)]
    pub(crate) legend: bool,
}

/// Configuration arguments to pass on to the spawned filter.
///
/// Drops the program name and the flags only the driver reads, so the
/// filter sees the same provider and logging settings.
pub(crate) fn filter_arguments(config_arguments: &[OsString]) -> Vec<OsString> {
    let mut forwarded = Vec::new();
    let mut skip_value = false;
    for argument in config_arguments.iter().skip(1) {
        if skip_value {
            skip_value = false;
            continue;
        }
        match driver_only_flag(argument) {
            Some(has_inline_value) => skip_value = !has_inline_value,
            None => forwarded.push(argument.clone()),
        }
    }
    forwarded
}

/// Returns whether the flag carries its value inline, or `None` when the
/// argument is not a driver-only flag.
fn driver_only_flag(argument: &OsStr) -> Option<bool> {
    let text = argument.to_string_lossy();
    let mut parts = text.splitn(2, '=');
    let flag = parts.next().unwrap_or_default();
    DRIVER_ONLY_FLAGS
        .contains(&flag)
        .then(|| parts.next().is_some())
}
