//! Unit and behavioural tests for the filter entry points.


use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;

use worm_protocol::{DomainInfo, ObjectHandle};

use crate::provider::{FixtureDomainProvider, ProviderReply};
use crate::{Clock, Verbosity, run, serve};

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

fn run_with(args: &[&str], input: &str) -> (ExitCode, String, String) {
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args, &mut stdin, &mut stdout, &mut stderr);
    (
        code,
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

#[test]
fn help_is_printed_to_stdout() {
    let (code, stdout, stderr) = run_with(&["worm-filter", "--help"], "");
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(stdout.contains("--verbose"), "stdout: {stdout}");
    assert!(stderr.is_empty(), "stderr: {stderr}");
}

#[test]
fn unknown_flag_fails_before_reading_input() {
    let (code, stdout, stderr) = run_with(&["worm-filter", "--bogus"], "12345\n");
    assert_eq!(code, ExitCode::FAILURE);
    assert!(stdout.is_empty(), "stdout: {stdout}");
    assert!(stderr.starts_with("worm-filter: "), "stderr: {stderr}");
}

#[test]
fn serve_reports_summary() {
    let provider = FixtureDomainProvider::from_replies([(
        ObjectHandle::new(1),
        ProviderReply::Ok(DomainInfo::default()),
    )]);
    let mut input = Cursor::new(b"1\n2\n-1\n".to_vec());
    let mut output = Vec::new();

    let summary = serve(
        provider,
        FixedClock(0),
        &mut input,
        &mut output,
        Verbosity::Silent,
    )
    .expect("session runs");

    assert_eq!(summary.requests, 2);
    assert_eq!(summary.failure_count(), 2);
    assert_eq!(
        String::from_utf8_lossy(&output),
        "P -5 0 NOT A SMARTLOCK FILE OR DIRECTORY\nP -3 2 OSError: No such file or directory\n"
    );
}
