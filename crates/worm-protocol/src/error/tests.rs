//! Unit tests for protocol error types.

use rstest::rstest;

use super::*;

#[rstest]
#[case::value_with_errno(ProviderError::value(Some(22), "bad lin"), 22)]
#[case::value_without_errno(ProviderError::value(None, "bad lin"), 0)]
#[case::system(ProviderError::system(5), 5)]
fn sub_code_follows_errno(#[case] error: ProviderError, #[case] expected: i64) {
    assert_eq!(error.sub_code(), expected);
}

#[test]
fn system_error_carries_os_description() {
    let error = ProviderError::system(2);
    let message = error.message();
    assert!(!message.is_empty());
    assert!(
        !message.contains("os error"),
        "suffix should be stripped: {message}"
    );
}

#[test]
fn io_error_without_code_uses_fallback() {
    let io = io::Error::new(io::ErrorKind::UnexpectedEof, "helper closed stdout");
    assert_eq!(ProviderError::from_io(&io, 5).sub_code(), 5);
}

#[test]
fn io_error_with_code_keeps_it() {
    let io = io::Error::from_raw_os_error(32);
    assert_eq!(ProviderError::from_io(&io, 5).sub_code(), 32);
}

#[test]
fn parse_errors_name_the_offending_column() {
    let error = ResponseParseError::BadNumber {
        column: "w_ctime",
        value: "abc".into(),
    };
    let message = error.to_string();
    assert!(message.contains("w_ctime"), "missing column: {message}");
    assert!(message.contains("abc"), "missing value: {message}");
}
