//! Response records and their fixed-column line encoding.
//!
//! Every non-terminating request produces exactly one line. A success line
//! carries twelve whitespace-separated tokens; a failure line carries the
//! tag, a negative code, a sub-code, and a free-text reason.

use std::fmt;
use std::str::FromStr;

use strum::{EnumIter, IntoStaticStr};

use crate::domain::{DomainEntry, WormState};
use crate::error::ResponseParseError;

/// Leading token of every response line.
pub const RESPONSE_TAG: &str = "P";

/// Column legend for success lines.
pub const COLUMN_HEADING: &str = "py_p py_rc py_errno w_ref_date w_committed w_ctime \
                                  w_retention_date w_auto_offset w_min_offset w_max_offset \
                                  w_def_offset w_override_date";

const COLUMNS: [&str; SUCCESS_TOKENS] = [
    "py_p",
    "py_rc",
    "py_errno",
    "w_ref_date",
    "w_committed",
    "w_ctime",
    "w_retention_date",
    "w_auto_offset",
    "w_min_offset",
    "w_max_offset",
    "w_def_offset",
    "w_override_date",
];

const SUCCESS_TOKENS: usize = 12;

/// Per-request failure classes, each with a fixed negative code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// A pathname could not be `lstat`-ed.
    PathResolutionError,
    /// The provider rejected the handle.
    DomainValueError,
    /// The provider failed at the OS level.
    DomainSystemError,
    /// The object is a SmartLock directory.
    DirectoryDomainSkipped,
    /// The object has no WORM state or domain.
    NotAWormObject,
}

impl FailureKind {
    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::PathResolutionError => -1,
            Self::DomainValueError => -2,
            Self::DomainSystemError => -3,
            Self::DirectoryDomainSkipped => -4,
            Self::NotAWormObject => -5,
        }
    }

    /// Maps a wire code back to its kind.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::PathResolutionError),
            -2 => Some(Self::DomainValueError),
            -3 => Some(Self::DomainSystemError),
            -4 => Some(Self::DirectoryDomainSkipped),
            -5 => Some(Self::NotAWormObject),
            _ => None,
        }
    }

    /// Reason text written when no more specific detail is available.
    #[must_use]
    pub const fn default_reason(self) -> &'static str {
        match self {
            Self::PathResolutionError => "lstat() error",
            Self::DomainValueError => "ValueError:",
            Self::DomainSystemError => "OSError:",
            Self::DirectoryDomainSkipped => "SKIPPING SMARTLOCK DIRECTORY",
            Self::NotAWormObject => "NOT A SMARTLOCK FILE OR DIRECTORY",
        }
    }

    /// Returns the snake-case name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The eight WORM columns that follow `w_ref_date` on a success line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WormFields {
    /// Non-zero once retention is committed.
    pub committed: i64,
    /// Commit timestamp.
    pub ctime: i64,
    /// Effective retention expiry.
    pub retention_date: i64,
    /// Domain autocommit offset.
    pub autocommit_offset: i64,
    /// Domain minimum retention.
    pub min_offset: i64,
    /// Domain maximum retention.
    pub max_offset: i64,
    /// Domain default retention.
    pub default_offset: i64,
    /// Domain override date.
    pub override_retention: i64,
}

impl WormFields {
    /// Combines the primary domain entry with the object's WORM state.
    #[must_use]
    pub const fn from_parts(domain: &DomainEntry, state: &WormState) -> Self {
        Self {
            committed: state.committed,
            ctime: state.ctime,
            retention_date: state.retention_date,
            autocommit_offset: domain.autocommit_offset,
            min_offset: domain.min_offset,
            max_offset: domain.max_offset,
            default_offset: domain.default_offset,
            override_retention: domain.override_retention,
        }
    }

    const fn columns(&self) -> [i64; 8] {
        [
            self.committed,
            self.ctime,
            self.retention_date,
            self.autocommit_offset,
            self.min_offset,
            self.max_offset,
            self.default_offset,
            self.override_retention,
        ]
    }

    const fn from_columns(columns: [i64; 8]) -> Self {
        let [
            committed,
            ctime,
            retention_date,
            autocommit_offset,
            min_offset,
            max_offset,
            default_offset,
            override_retention,
        ] = columns;
        Self {
            committed,
            ctime,
            retention_date,
            autocommit_offset,
            min_offset,
            max_offset,
            default_offset,
            override_retention,
        }
    }
}

/// Successful lookup: the reference timestamp plus the WORM columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WormResponse {
    /// Wall-clock seconds captured right after the lookup succeeded.
    pub ref_date: i64,
    /// WORM columns.
    pub fields: WormFields,
}

/// Failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureResponse {
    kind: FailureKind,
    sub_code: i64,
    reason: String,
}

impl FailureResponse {
    /// Returns the failure class.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the sub-code (an errno, or zero).
    #[must_use]
    pub const fn sub_code(&self) -> i64 {
        self.sub_code
    }

    /// Returns the single-line reason text.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseRecord {
    /// The object is a WORM file.
    Success(WormResponse),
    /// The request failed and carries a classified reason.
    Failure(FailureResponse),
}

impl ResponseRecord {
    /// Builds a success record.
    #[must_use]
    pub const fn success(ref_date: i64, fields: WormFields) -> Self {
        Self::Success(WormResponse { ref_date, fields })
    }

    /// Builds a failure record with the kind's default reason.
    #[must_use]
    pub fn failure(kind: FailureKind, sub_code: i64) -> Self {
        Self::failure_with_reason(kind, sub_code, kind.default_reason())
    }

    /// Builds a failure record with an explicit reason.
    ///
    /// Whitespace runs, including newlines, collapse to single spaces so the
    /// record always encodes to exactly one line.
    #[must_use]
    pub fn failure_with_reason(kind: FailureKind, sub_code: i64, reason: &str) -> Self {
        Self::Failure(FailureResponse {
            kind,
            sub_code,
            reason: reason.split_whitespace().collect::<Vec<_>>().join(" "),
        })
    }

    /// Returns the wire code: zero on success.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Success(_) => 0,
            Self::Failure(failure) => failure.kind.code(),
        }
    }

    /// Returns the failure class, if any.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    /// Returns the success payload, if any.
    #[must_use]
    pub const fn as_success(&self) -> Option<&WormResponse> {
        match self {
            Self::Success(response) => Some(response),
            Self::Failure(_) => None,
        }
    }
}

impl fmt::Display for ResponseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(response) => {
                write!(f, "{RESPONSE_TAG} 0 0 {}", response.ref_date)?;
                for value in response.fields.columns() {
                    write!(f, " {value}")?;
                }
                Ok(())
            }
            Self::Failure(failure) => {
                write!(
                    f,
                    "{RESPONSE_TAG} {} {}",
                    failure.kind.code(),
                    failure.sub_code
                )?;
                if !failure.reason.is_empty() {
                    write!(f, " {}", failure.reason)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for ResponseRecord {
    type Err = ResponseParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let tag = tokens.first().copied().unwrap_or_default();
        if tag != RESPONSE_TAG {
            return Err(ResponseParseError::MissingTag {
                found: tag.to_owned(),
            });
        }
        if tokens.len() < 3 {
            return Err(ResponseParseError::TooShort {
                found: tokens.len(),
            });
        }

        let code = parse_column(&tokens, 1)?;
        let sub_code = parse_column(&tokens, 2)?;
        if code == 0 {
            if sub_code != 0 {
                return Err(ResponseParseError::SuccessSubCode { sub_code });
            }
            return parse_success(&tokens);
        }

        let kind = FailureKind::from_code(code).ok_or(ResponseParseError::UnknownCode { code })?;
        Ok(Self::failure_with_reason(
            kind,
            sub_code,
            &tokens.get(3..).unwrap_or_default().join(" "),
        ))
    }
}

fn parse_success(tokens: &[&str]) -> Result<ResponseRecord, ResponseParseError> {
    if tokens.len() != SUCCESS_TOKENS {
        return Err(ResponseParseError::FieldCount {
            found: tokens.len(),
        });
    }
    let ref_date = parse_column(tokens, 3)?;
    let mut columns = [0_i64; 8];
    for (offset, slot) in columns.iter_mut().enumerate() {
        *slot = parse_column(tokens, 4 + offset)?;
    }
    Ok(ResponseRecord::success(
        ref_date,
        WormFields::from_columns(columns),
    ))
}

fn parse_column(tokens: &[&str], index: usize) -> Result<i64, ResponseParseError> {
    let value = tokens.get(index).copied().unwrap_or_default();
    value.parse().map_err(|_| ResponseParseError::BadNumber {
        column: COLUMNS.get(index).copied().unwrap_or("?"),
        value: value.to_owned(),
    })
}
