//! Classifies one input line as a handle, a pathname, or the end of input.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use worm_protocol::ObjectHandle;

/// Sentinel value that ends the session.
pub const TERMINATE_SENTINEL: i128 = -1;

/// What a single input line asks the filter to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `-1` or a blank line: stop without writing a response.
    Terminate,
    /// Look up an object by its numeric handle.
    Handle(ObjectHandle),
    /// Integer input that cannot name an object (negative or too large).
    InvalidHandle(String),
    /// Resolve a pathname with `lstat` before the lookup.
    Path(PathBuf),
}

/// Classifies a line read from the walker.
///
/// The trailing newline (and a carriage return before it) is removed.
/// Lines that are blank after trimming terminate the session. Lines that
/// are an optionally signed run of ASCII digits, ignoring surrounding
/// whitespace, are integers; everything else is a pathname, taken verbatim
/// without trimming.
#[must_use]
pub fn classify(line: &str) -> Request {
    let raw = line
        .strip_suffix('\n')
        .map_or(line, |rest| rest.strip_suffix('\r').unwrap_or(rest));
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Request::Terminate;
    }
    if !is_integer(trimmed) {
        return Request::Path(PathBuf::from(raw));
    }

    match trimmed.parse::<i128>() {
        Ok(TERMINATE_SENTINEL) => Request::Terminate,
        Ok(value) => u64::try_from(value).map_or_else(
            |_| Request::InvalidHandle(trimmed.to_owned()),
            |raw_handle| Request::Handle(ObjectHandle::new(raw_handle)),
        ),
        Err(_) => Request::InvalidHandle(trimmed.to_owned()),
    }
}

/// Classifies a raw input line.
///
/// Lines that are not valid UTF-8 can only be pathnames; they are passed on
/// byte for byte with the line terminator removed.
#[must_use]
pub fn classify_bytes(line: &[u8]) -> Request {
    match std::str::from_utf8(line) {
        Ok(text) => classify(text),
        Err(_) => {
            let unterminated = line.strip_suffix(b"\n").unwrap_or(line);
            let raw = unterminated.strip_suffix(b"\r").unwrap_or(unterminated);
            Request::Path(PathBuf::from(OsStr::from_bytes(raw)))
        }
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}
