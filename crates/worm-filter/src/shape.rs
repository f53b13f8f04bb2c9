//! Rejects records that do not describe a WORM file.

use worm_protocol::{DomainEntry, DomainInfo, FailureKind, ResponseRecord, WormFields, WormState};

/// A record that passed the shape filter.
#[derive(Debug, Clone, PartialEq)]
pub struct WormObject {
    /// The first per-object domain entry.
    pub domain: DomainEntry,
    /// The object's commit state.
    pub state: WormState,
}

impl WormObject {
    /// Returns the columns written on a success line.
    #[must_use]
    pub const fn fields(&self) -> WormFields {
        WormFields::from_parts(&self.domain, &self.state)
    }
}

/// Applies the directory and WORM-state checks in order.
///
/// The ancestor check runs before anything else is decoded, so a SmartLock
/// directory is always skipped however its other fields look.
///
/// # Errors
///
/// Returns a `-4` response for SmartLock directories, a `-5` response when
/// the WORM state or the first domain entry is missing, and a `-2` response
/// with sub-code 0 when either is present but malformed.
pub fn shape(info: &DomainInfo) -> Result<WormObject, ResponseRecord> {
    if info.is_directory_domain() {
        return Err(ResponseRecord::failure(FailureKind::DirectoryDomainSkipped, 0));
    }
    let (Some(decoded_state), Some(decoded_domain)) = (info.worm_state(), info.primary_domain())
    else {
        return Err(ResponseRecord::failure(FailureKind::NotAWormObject, 0));
    };
    let state = decoded_state.map_err(|error| malformed("WORM state", &error))?;
    let domain = decoded_domain.map_err(|error| malformed("domain entry", &error))?;
    Ok(WormObject { domain, state })
}

fn malformed(part: &str, error: &serde_json::Error) -> ResponseRecord {
    let kind = FailureKind::DomainValueError;
    let reason = format!("{} malformed {part}: {error}", kind.default_reason());
    ResponseRecord::failure_with_reason(kind, 0, &reason)
}
