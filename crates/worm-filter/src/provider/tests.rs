//! Unit tests for provider replies and the fixture provider.

use std::io::Write;

use camino::Utf8PathBuf;
use rstest::rstest;
use tempfile::NamedTempFile;

use super::*;

const FIXTURE: &str = r#"{
    "12345": {"ok": {
        "domains": [{"flags": 2147483654, "id": 7, "generation": 3, "root_lin": 4096,
                     "autocommit_offset": 0, "min_offset": 1, "max_offset": 2,
                     "default_offset": 3, "override_retention": -1}],
        "worm_ancestors": [],
        "worm_state": {"committed": 1, "ctime": 1000, "retention_date": 2000}
    }},
    "99": {"value_error": {"errno": 22, "message": "bad lin"}},
    "7": {"os_error": {"errno": 5}}
}"#;

#[test]
fn fixture_serves_successful_records() {
    let mut provider = FixtureDomainProvider::from_json(FIXTURE).expect("fixture parses");
    let info = provider
        .domain_info(ObjectHandle::new(12_345))
        .expect("lookup succeeds");
    let domain = info.primary_domain().and_then(Result::ok);
    assert_eq!(domain.map(|domain| domain.id), Some(7));
}

#[rstest]
#[case::value_error(99, ProviderError::value(Some(22), "bad lin"))]
#[case::os_error(7, ProviderError::system(5))]
#[case::unknown(8, ProviderError::system(libc::ENOENT))]
fn fixture_failures_keep_their_class(#[case] lin: u64, #[case] expected: ProviderError) {
    let mut provider = FixtureDomainProvider::from_json(FIXTURE).expect("fixture parses");
    assert_eq!(provider.domain_info(ObjectHandle::new(lin)), Err(expected));
}

#[test]
fn fixture_rejects_non_numeric_keys() {
    let error = FixtureDomainProvider::from_json(r#"{"abc": {"ok": {}}}"#)
        .expect_err("key is not a handle");
    assert!(matches!(error, FixtureError::InvalidKey { key } if key == "abc"));
}

#[test]
fn fixture_rejects_unknown_reply_shapes() {
    let error = FixtureDomainProvider::from_json(r#"{"1": {"maybe": {}}}"#)
        .expect_err("reply shape is unknown");
    assert!(matches!(error, FixtureError::Parse(_)));
}

#[test]
fn os_error_without_errno_reports_eio() {
    let reply = ProviderReply::OsError(ReplyError::default());
    assert_eq!(reply.into_result(), Err(ProviderError::system(libc::EIO)));
}

#[test]
fn os_error_keeps_provider_message() {
    let reply = ProviderReply::OsError(ReplyError {
        errno: Some(13),
        message: String::from("Permission denied by policy"),
    });
    let error = reply.into_result().expect_err("reply is an error");
    assert_eq!(error.sub_code(), 13);
    assert_eq!(error.message(), "Permission denied by policy");
}

#[test]
fn build_provider_loads_fixture_from_config() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(FIXTURE.as_bytes()).expect("write fixture");
    let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).expect("utf-8 temp path");
    let config = Config {
        provider: ProviderKind::Fixture,
        fixture_path: Some(path),
        ..Config::default()
    };

    let mut provider = build_provider(&config).expect("provider builds");
    assert!(provider.domain_info(ObjectHandle::new(12_345)).is_ok());
}

#[test]
fn build_provider_reports_unreadable_fixture() {
    let config = Config {
        provider: ProviderKind::Fixture,
        fixture_path: Some(Utf8PathBuf::from("/nonexistent/fixture.json")),
        ..Config::default()
    };
    let Err(error) = build_provider(&config) else {
        panic!("missing fixture should fail");
    };
    assert!(matches!(
        error,
        ProviderSetupError::Fixture(FixtureError::Read { .. })
    ));
}
