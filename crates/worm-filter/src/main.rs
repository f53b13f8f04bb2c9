//! Binary entrypoint for the WORM retention filter.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    worm_filter::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
