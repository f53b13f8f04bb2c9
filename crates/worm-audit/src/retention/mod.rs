//! Effective retention derived from one successful filter response.
//!
//! The filter reports what is persisted; this module works out what it
//! means right now. An uncommitted file in an autocommit domain has an
//! ephemeral expiry that only becomes real when autocommit fires, and a
//! domain override can push any expiry later.

use strum::{Display, IntoStaticStr};
use worm_protocol::WormResponse;

/// What the effective expiry is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum RetentionBasis {
    /// Committed and already expired.
    #[strum(serialize = "<")]
    Expired,
    /// The domain override sets the expiry.
    #[strum(serialize = "!")]
    Override,
    /// Committed, expiring in the future.
    #[strum(serialize = ">")]
    Committed,
    /// Uncommitted without autocommit; expiry is not knowable yet.
    #[strum(serialize = "?")]
    Unknown,
    /// Uncommitted; expiry follows from the pending autocommit.
    #[strum(serialize = "*")]
    Autocommit,
    /// Uncommitted with an explicitly set retention date.
    #[strum(serialize = "=")]
    Forced,
    /// A combination the rules above do not cover.
    #[strum(serialize = "E")]
    Unexpected,
}

/// SmartLock domain flavour, inferred from the WORM ctime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum LockDomain {
    /// Compliance mode: the compliance clock stamped `w_ctime`.
    #[strum(serialize = "C")]
    Compliance,
    /// Enterprise mode.
    #[strum(serialize = "E")]
    Enterprise,
}

/// Lock state of the file at the reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum LockStatus {
    /// Committed and past its expiry: read-only but deletable.
    #[strum(serialize = "X")]
    Expired,
    /// Committed: read-only and not deletable.
    #[strum(serialize = "C")]
    Committed,
    /// Autocommit is due but has not been applied yet.
    #[strum(serialize = "c")]
    LatentCommit,
    /// Not locked.
    #[strum(serialize = "-")]
    Unlocked,
}

/// Derived retention values for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionAssessment {
    /// `w_ctime` when set, else the file's `st_ctime`.
    pub eff_ctime: i64,
    /// When autocommit fires, or 0 when the domain has none.
    pub eff_auto_date: i64,
    /// Effective expiry, or 0 when not knowable.
    pub eff_retention_date: i64,
    /// Committed and expired at the reference time.
    pub expired: bool,
    /// Basis of `eff_retention_date`.
    pub basis: RetentionBasis,
    /// Domain flavour.
    pub domain: LockDomain,
    /// Lock state.
    pub status: LockStatus,
}

/// Evaluates a success response for a file whose status changed at
/// `st_ctime`.
#[must_use]
pub fn evaluate(response: &WormResponse, st_ctime: i64) -> RetentionAssessment {
    let fields = &response.fields;
    let ref_date = response.ref_date;
    let committed = fields.committed != 0;

    let eff_ctime = if fields.ctime == 0 {
        st_ctime
    } else {
        fields.ctime
    };
    let eff_auto_date = if fields.autocommit_offset == 0 {
        0
    } else {
        eff_ctime.saturating_add(fields.autocommit_offset)
    };

    let mut eff_retention_date = if committed {
        fields.retention_date
    } else if eff_auto_date != 0 {
        let requested = if fields.retention_date == 0 {
            fields.default_offset
        } else {
            fields.retention_date.saturating_sub(eff_auto_date)
        };
        eff_auto_date.saturating_add(clamp_offset(requested, fields.min_offset, fields.max_offset))
    } else {
        0
    };

    if fields.override_retention > eff_retention_date && fields.override_retention > ref_date {
        eff_retention_date = fields.override_retention;
    }

    let expired = committed && eff_retention_date <= ref_date;
    let basis = if expired {
        RetentionBasis::Expired
    } else if eff_retention_date != fields.retention_date
        && eff_retention_date == fields.override_retention
    {
        RetentionBasis::Override
    } else if committed {
        RetentionBasis::Committed
    } else if eff_retention_date == 0 {
        RetentionBasis::Unknown
    } else if eff_auto_date != 0 {
        RetentionBasis::Autocommit
    } else if fields.retention_date != 0 {
        RetentionBasis::Forced
    } else {
        RetentionBasis::Unexpected
    };

    let status = if expired {
        LockStatus::Expired
    } else if committed {
        LockStatus::Committed
    } else if eff_auto_date != 0 && eff_auto_date <= ref_date {
        LockStatus::LatentCommit
    } else {
        LockStatus::Unlocked
    };

    let domain = if fields.ctime == 0 {
        LockDomain::Enterprise
    } else {
        LockDomain::Compliance
    };

    RetentionAssessment {
        eff_ctime,
        eff_auto_date,
        eff_retention_date,
        expired,
        basis,
        domain,
        status,
    }
}

/// Applies the domain bounds; the minimum wins when the bounds cross.
const fn clamp_offset(offset: i64, min_offset: i64, max_offset: i64) -> i64 {
    let capped = if offset > max_offset { max_offset } else { offset };
    if capped < min_offset { min_offset } else { capped }
}
