//! Numeric object handles (LINs).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique numeric identifier of a filesystem object (inode-equivalent).
///
/// Obtained either directly from an input line or from the inode number
/// of an `lstat`-ed pathname. Handles are scoped to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ObjectHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_decimal() {
        assert_eq!(ObjectHandle::new(4_295_229_443).to_string(), "4295229443");
    }

    #[test]
    fn serialises_transparently() {
        let json = serde_json::to_string(&ObjectHandle::new(12_345)).expect("serialise");
        assert_eq!(json, "12345");
    }
}
