//! Domain-info records returned by the metadata provider.
//!
//! The provider answers a lookup with a nested record: a sequence of
//! per-object domain entries, an optional WORM state, and, for SmartLock
//! directories only, a sequence of ancestor domain references. Fields the
//! filter never interprets are kept in a flattened map so verbose dumps
//! show the record as the provider produced it.
//!
//! Domain entries and the WORM state stay as raw JSON until asked for:
//! only the first entry is ever consumed, and a SmartLock directory is
//! recognised from its ancestors alone, so neither may be rejected over
//! entries the filter never reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Retention offset meaning "expire immediately".
pub const RETAIN_EXPIRE_NOW: i64 = 0;

/// Retention offset meaning "retain forever".
pub const RETAIN_FOREVER: i64 = 0x7FFF_FFFF_FFFF_FFFE;

/// Opaque reference to an ancestor domain.
pub type DomainRef = Value;

/// Returns a label for the reserved retention sentinels.
#[must_use]
pub const fn describe_offset(offset: i64) -> Option<&'static str> {
    match offset {
        RETAIN_EXPIRE_NOW => Some("NOW"),
        RETAIN_FOREVER => Some("FOREVER"),
        _ => None,
    }
}

/// Raw record returned for one object handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Per-object domain entries; only the first is ever consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<Value>>,
    /// Ancestor domains; present and non-empty only for SmartLock
    /// directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worm_ancestors: Option<Vec<DomainRef>>,
    /// Commit state of the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worm_state: Option<Value>,
    /// Provider fields the filter does not interpret.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl DomainInfo {
    /// Returns true when the object is a directory carrying a SmartLock
    /// domain.
    #[must_use]
    pub fn is_directory_domain(&self) -> bool {
        self.worm_ancestors
            .as_ref()
            .is_some_and(|ancestors| !ancestors.is_empty())
    }

    /// Decodes the first per-object domain entry, if any.
    ///
    /// Later entries are never decoded.
    #[must_use]
    pub fn primary_domain(&self) -> Option<serde_json::Result<DomainEntry>> {
        self.domains
            .as_deref()
            .and_then(<[Value]>::first)
            .map(DomainEntry::deserialize)
    }

    /// Decodes the WORM state, if any.
    #[must_use]
    pub fn worm_state(&self) -> Option<serde_json::Result<WormState>> {
        self.worm_state.as_ref().map(WormState::deserialize)
    }
}

/// One retention domain governing an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    /// Domain property bits.
    pub flags: DomainFlags,
    /// Domain identity.
    pub id: u64,
    /// Domain version.
    pub generation: u64,
    /// Handle of the domain root.
    pub root_lin: u64,
    /// Seconds of inactivity before an uncommitted file commits.
    pub autocommit_offset: i64,
    /// Minimum retention, in seconds.
    pub min_offset: i64,
    /// Maximum retention, in seconds.
    pub max_offset: i64,
    /// Retention applied when none is requested, in seconds.
    pub default_offset: i64,
    /// Date overriding computed retention.
    pub override_retention: i64,
    /// Provider fields the filter does not interpret.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Commit state of a single object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WormState {
    /// Non-zero once retention has been committed.
    pub committed: i64,
    /// Commit timestamp (compliance clock in compliance mode).
    pub ctime: i64,
    /// Effective retention expiry.
    pub retention_date: i64,
}

impl WormState {
    /// Returns true when retention has been committed.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed != 0
    }
}

/// Bitmask of domain properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainFlags(u64);

impl DomainFlags {
    /// Domain is ready.
    pub const READY: u64 = 1 << 31;
    /// Domain is being reverted from a snapshot.
    pub const SNAPREVERT: u64 = 1 << 7;
    /// Privileged delete permanently disabled.
    pub const PRIVDEL_DISABLED: u64 = 1 << 6;
    /// Privileged delete enabled.
    pub const PRIVDEL_ON: u64 = 1 << 5;
    /// Domain is a replication target.
    pub const SYNCIQ: u64 = 1 << 3;
    /// Compliance-mode domain.
    pub const COMPLIANCE: u64 = 1 << 2;
    /// WORM-enabled domain.
    pub const WORM: u64 = 1 << 1;
    /// Writes restricted.
    pub const RESTRICTED_WRITE: u64 = 1 << 0;

    const NAMES: [(u64, &'static str); 8] = [
        (Self::READY, "DOM_READY"),
        (Self::SNAPREVERT, "DOM_SNAPREVERT"),
        (Self::PRIVDEL_DISABLED, "DOM_PRIVDEL_DISABLED"),
        (Self::PRIVDEL_ON, "DOM_PRIVDEL_ON"),
        (Self::SYNCIQ, "DOM_SYNCIQ"),
        (Self::COMPLIANCE, "DOM_COMPLIANCE"),
        (Self::WORM, "DOM_WORM"),
        (Self::RESTRICTED_WRITE, "DOM_RESTRICTED_WRITE"),
    ];

    /// Wraps a raw bitmask.
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true when every bit in `mask` is set.
    #[must_use]
    pub const fn contains(self, mask: u64) -> bool {
        (self.0 & mask) == mask
    }

    /// Returns true for compliance-mode domains.
    #[must_use]
    pub const fn is_compliance(self) -> bool {
        self.contains(Self::COMPLIANCE)
    }

    /// Names of the set bits, most significant first.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(mask, _)| self.contains(*mask))
            .map(|(_, name)| name)
    }
}

impl fmt::Display for DomainFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)?;
        for name in self.names() {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
