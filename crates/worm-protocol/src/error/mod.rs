//! Error types shared by both ends of the protocol.
//!
//! [`ProviderError`] is the discriminated failure a metadata provider
//! returns: value-like failures become `-2` responses and system-like
//! failures become `-3` responses. [`ResponseParseError`] is raised when
//! a driver reads back a line that does not follow the response grammar.

use std::io;

use thiserror::Error;

/// Failure returned by a metadata provider lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected the handle or its arguments.
    #[error("domain value error: {message}")]
    Value {
        /// Errno reported by the provider, when it carried one.
        errno: Option<i32>,
        /// Provider-supplied description.
        message: String,
    },

    /// The provider failed at the OS or I/O level.
    #[error("domain system error (errno {errno}): {message}")]
    System {
        /// Errno reported by the provider.
        errno: i32,
        /// OS description of the errno.
        message: String,
    },
}

impl ProviderError {
    /// Builds a value error.
    #[must_use]
    pub fn value(errno: Option<i32>, message: impl Into<String>) -> Self {
        Self::Value {
            errno,
            message: message.into(),
        }
    }

    /// Builds a system error described by the OS text for `errno`.
    #[must_use]
    pub fn system(errno: i32) -> Self {
        Self::System {
            errno,
            message: describe_errno(errno),
        }
    }

    /// Builds a system error from an I/O failure, using `fallback` when the
    /// error carries no OS code.
    #[must_use]
    pub fn from_io(error: &io::Error, fallback: i32) -> Self {
        error
            .raw_os_error()
            .map_or_else(|| Self::system(fallback), Self::system)
    }

    /// Returns the sub-code written on the response line.
    #[must_use]
    pub fn sub_code(&self) -> i64 {
        match self {
            Self::Value { errno, .. } => errno.map_or(0, i64::from),
            Self::System { errno, .. } => i64::from(*errno),
        }
    }

    /// Returns the provider-supplied description.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Value { message, .. } | Self::System { message, .. } => message,
        }
    }
}

/// Returns the OS description of `errno` without the `(os error N)` suffix
/// that `io::Error` appends.
#[must_use]
pub fn describe_errno(errno: i32) -> String {
    let text = io::Error::from_raw_os_error(errno).to_string();
    text.split(" (os error ")
        .next()
        .map_or_else(String::new, str::to_owned)
}

/// Failure to parse a response line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseParseError {
    /// The line did not start with the response tag.
    #[error("expected response tag 'P', found '{found}'")]
    MissingTag {
        /// First token of the line, empty when the line was blank.
        found: String,
    },

    /// The line had fewer than the three mandatory tokens.
    #[error("response line has {found} tokens, expected at least 3")]
    TooShort {
        /// Number of tokens present.
        found: usize,
    },

    /// A numeric column did not hold an integer.
    #[error("column '{column}' is not an integer: '{value}'")]
    BadNumber {
        /// Column name from the response heading.
        column: &'static str,
        /// Offending token.
        value: String,
    },

    /// The response code is outside the known range.
    #[error("unknown response code {code}")]
    UnknownCode {
        /// Code that was read.
        code: i64,
    },

    /// A success line carried a non-zero sub-code.
    #[error("success line has sub-code {sub_code}, expected 0")]
    SuccessSubCode {
        /// Sub-code that was read.
        sub_code: i64,
    },

    /// A success line did not carry exactly twelve tokens.
    #[error("success line has {found} tokens, expected 12")]
    FieldCount {
        /// Number of tokens present.
        found: usize,
    },
}

#[cfg(test)]
mod tests;
