//! Integration tests for the `worm-audit` binary entry point.
//!
//! A shell script stands in for `worm-filter`, answering every handle with
//! the same committed-file response.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::{contains, is_empty};
use tempfile::TempDir;

const FAKE_FILTER: &str = "#!/bin/sh
echo started >> \"$(dirname \"$0\")/spawns\"
while read lin; do
    [ \"$lin\" = -1 ] && exit 0
    echo 'P 0 0 1000 1 990 5000 0 0 0 0 0'
done
";

#[test]
fn audits_files_through_the_filter() {
    let dir = TempDir::new().expect("temp dir");
    let filter = dir.path().join("fake-filter");
    fs::write(&filter, FAKE_FILTER).expect("write filter");
    fs::set_permissions(&filter, fs::Permissions::from_mode(0o755)).expect("chmod");
    let data = dir.path().join("data");
    fs::create_dir(&data).expect("data dir");
    let first = data.join("first");
    let second = data.join("second");
    fs::write(&first, b"one").expect("write");
    fs::write(&second, b"two").expect("write");

    let mut command = cargo_bin_cmd!("worm-audit");
    command
        .arg(format!("--filter-command={}", filter.display()))
        .arg("--rejuvenate-after")
        .arg("1")
        .env_remove("WORM_FILTER_LOG_FILTER")
        .write_stdin(format!(
            "{}\n{}\n{}\n",
            first.display(),
            data.display(),
            second.display()
        ));

    let expected_first = format!("\"{}\"", first.display());
    let expected_second = format!("\"{}\"", second.display());
    command
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"\AC,C,1000,(\d+,){4}990,5000,0,>,5000,\d+,3,\d+,")
                .expect("valid regex")
                .and(contains(expected_first))
                .and(contains(expected_second))
                .and(contains(format!("\"{}\"", data.display())).not()),
        );

    let spawns = fs::read_to_string(dir.path().join("spawns")).expect("spawn log");
    assert_eq!(spawns.lines().count(), 2, "one filter per lookup");
}

#[test]
fn legend_goes_to_stderr() {
    let mut command = cargo_bin_cmd!("worm-audit");
    command.arg("--legend").write_stdin("");

    command
        .assert()
        .success()
        .stdout(is_empty())
        .stderr(contains("lock_domain_type").and(contains("eff_retention_date")));
}

#[test]
fn unstartable_filter_fails_the_audit() {
    let dir = TempDir::new().expect("temp dir");
    let file = dir.path().join("file");
    fs::write(&file, b"x").expect("write");

    let mut command = cargo_bin_cmd!("worm-audit");
    command
        .arg("--filter-command=/nonexistent/worm-filter")
        .write_stdin(format!("{}\n", file.display()));

    command
        .assert()
        .failure()
        .stderr(contains("failed to spawn filter"));
}
