//! One CSV line per audited file.

use std::fmt;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use worm_protocol::{ObjectHandle, ResponseRecord};

use crate::retention::{RetentionAssessment, evaluate};

/// Column key printed by `--legend`.
pub const LEGEND: &str = "\
Columns of each audit line:
 1. lock_domain_type: 'C' compliance, 'E' enterprise, '-' lookup failed
 2. lock_status: '-' not locked, 'C' committed, 'c' latent commit,
    'X' expired; the response code when the lookup failed
 3. ref_date: time the retention state was read
 4. st_atime
 5. st_mtime
 6. st_ctime
 7. st_birthtime
 8. w_ctime
 9. w_retention_date
10. eff_auto_date: when autocommit fires, 0 without autocommit
11. eff_retention_type: basis of the effective expiry
    '?' not yet knowable, '!' override, '<' committed and past,
    '>' committed and future, '*' pending autocommit,
    '=' retention date set on an uncommitted file, 'E' unexpected
12. eff_retention_date: effective expiry
13. st_uid
14. st_size
15. st_blocks
16. \"path\"
";

/// `lstat` fields reported for an audited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectStat {
    /// Inode number, queried as the object handle.
    pub handle: u64,
    /// Owner.
    pub uid: u32,
    /// Size in bytes.
    pub size: u64,
    /// Allocated 512-byte blocks.
    pub blocks: u64,
    /// Last access time.
    pub atime: i64,
    /// Last modification time.
    pub mtime: i64,
    /// Last status change time.
    pub ctime: i64,
    /// Creation time, 0 when the platform has none.
    pub birthtime: i64,
}

impl ObjectStat {
    /// Extracts the audited fields from `lstat` metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let birthtime = metadata
            .created()
            .ok()
            .and_then(|created| created.duration_since(UNIX_EPOCH).ok())
            .and_then(|since| i64::try_from(since.as_secs()).ok())
            .unwrap_or_default();
        Self {
            handle: metadata.ino(),
            uid: metadata.uid(),
            size: metadata.size(),
            blocks: metadata.blocks(),
            atime: metadata.atime(),
            mtime: metadata.mtime(),
            ctime: metadata.ctime(),
            birthtime,
        }
    }

    /// Handle queried for this file.
    #[must_use]
    pub const fn object_handle(&self) -> ObjectHandle {
        ObjectHandle::new(self.handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Assessed {
        ref_date: i64,
        w_ctime: i64,
        w_retention_date: i64,
        assessment: RetentionAssessment,
    },
    LookupFailed {
        code: i64,
    },
}

/// Audit line for one file, rendered by [`fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditRecord<'a> {
    path: &'a Path,
    stat: &'a ObjectStat,
    outcome: Outcome,
}

impl<'a> AuditRecord<'a> {
    /// Evaluates `response` for the file at `path`.
    #[must_use]
    pub fn new(path: &'a Path, stat: &'a ObjectStat, response: &ResponseRecord) -> Self {
        let outcome = match response.as_success() {
            Some(success) => Outcome::Assessed {
                ref_date: success.ref_date,
                w_ctime: success.fields.ctime,
                w_retention_date: success.fields.retention_date,
                assessment: evaluate(success, stat.ctime),
            },
            None => Outcome::LookupFailed {
                code: response.code(),
            },
        };
        Self {
            path,
            stat,
            outcome,
        }
    }

    /// Retention derived for the file; `None` when the lookup failed.
    #[must_use]
    pub const fn assessment(&self) -> Option<&RetentionAssessment> {
        match &self.outcome {
            Outcome::Assessed { assessment, .. } => Some(assessment),
            Outcome::LookupFailed { .. } => None,
        }
    }
}

impl fmt::Display for AuditRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stat = self.stat;
        match self.outcome {
            Outcome::Assessed {
                ref_date,
                w_ctime,
                w_retention_date,
                assessment,
            } => write!(
                f,
                "{},{},{ref_date},{},{},{},{},{w_ctime},{w_retention_date},{},{},{}",
                assessment.domain,
                assessment.status,
                stat.atime,
                stat.mtime,
                stat.ctime,
                stat.birthtime,
                assessment.eff_auto_date,
                assessment.basis,
                assessment.eff_retention_date,
            )?,
            Outcome::LookupFailed { code } => write!(f, "-,{code},0,0,0,0,0,0,0,0,?,0")?,
        }
        write!(
            f,
            ",{},{},{},\"{}\"",
            stat.uid,
            stat.size,
            stat.blocks,
            self.path.display()
        )
    }
}
