//! Wire types for the WORM retention co-process protocol.
//!
//! A driving walker writes one object identifier per line to the filter's
//! stdin and reads exactly one response line back:
//!
//! ```text
//! P 0 0 <w_ref_date> <committed> <ctime> <retention_date> <autocommit_offset> <min_offset> <max_offset> <default_offset> <override_retention>
//! P <code> <sub_code> <reason>
//! ```
//!
//! This crate owns both halves of that exchange. [`DomainInfo`] models the
//! record returned by the metadata provider, [`ResponseRecord`] is the
//! per-request result with its fixed-column encoding and parser, and
//! [`ProviderError`] is the two-bucket failure type every provider returns.
//!
//! # Example
//!
//! ```
//! use worm_protocol::{FailureKind, ResponseRecord};
//!
//! let record = ResponseRecord::failure(FailureKind::DirectoryDomainSkipped, 0);
//! let line = record.to_string();
//! assert_eq!(line, "P -4 0 SKIPPING SMARTLOCK DIRECTORY");
//! assert_eq!(line.parse::<ResponseRecord>().ok(), Some(record));
//! ```

pub mod domain;
pub mod error;
pub mod handle;
pub mod response;

pub use self::domain::{
    DomainEntry, DomainFlags, DomainInfo, DomainRef, RETAIN_EXPIRE_NOW, RETAIN_FOREVER,
    WormState, describe_offset,
};
pub use self::error::{ProviderError, ResponseParseError, describe_errno};
pub use self::handle::ObjectHandle;
pub use self::response::{
    COLUMN_HEADING, FailureKind, FailureResponse, RESPONSE_TAG, ResponseRecord, WormFields,
    WormResponse,
};
