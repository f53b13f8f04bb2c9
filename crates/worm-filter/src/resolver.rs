//! Resolves requests to domain-info records.
//!
//! Failures here never escape as errors: each one is classified into the
//! response it produces, so the request loop only ever writes lines.

use std::fs::Metadata;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tracing::debug;
use worm_protocol::{
    DomainInfo, FailureKind, ObjectHandle, ProviderError, ResponseRecord, describe_errno,
};

use crate::clock::Clock;
use crate::provider::DomainProvider;

const RESOLVER_TARGET: &str = "worm_filter::resolver";

/// `lstat` results kept for the verbose breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStat {
    /// Inode number, used as the object handle.
    pub handle: ObjectHandle,
    /// Last access time.
    pub atime: i64,
    /// Last modification time.
    pub mtime: i64,
    /// Last status change time.
    pub ctime: i64,
    /// Creation time, when the platform reports one.
    pub birthtime: Option<i64>,
}

impl PathStat {
    fn from_metadata(metadata: &Metadata) -> Self {
        let birthtime = metadata
            .created()
            .ok()
            .and_then(|created| created.duration_since(UNIX_EPOCH).ok())
            .and_then(|since| i64::try_from(since.as_secs()).ok());
        Self {
            handle: ObjectHandle::new(metadata.ino()),
            atime: metadata.atime(),
            mtime: metadata.mtime(),
            ctime: metadata.ctime(),
            birthtime,
        }
    }
}

/// `lstat`s a pathname to obtain its handle.
///
/// # Errors
///
/// Returns a `-1` response carrying the OS errno, or `0` when the failure
/// has none.
pub fn lstat(path: &Path) -> Result<PathStat, ResponseRecord> {
    std::fs::symlink_metadata(path)
        .map(|metadata| PathStat::from_metadata(&metadata))
        .map_err(|error| {
            debug!(
                target: RESOLVER_TARGET,
                path = %path.display(),
                %error,
                "lstat failed"
            );
            path_failure(&error)
        })
}

fn path_failure(error: &io::Error) -> ResponseRecord {
    let kind = FailureKind::PathResolutionError;
    let errno = error.raw_os_error().unwrap_or(0);
    if errno == 0 {
        return ResponseRecord::failure(kind, 0);
    }
    let reason = format!("{}: {}", kind.default_reason(), describe_errno(errno));
    ResponseRecord::failure_with_reason(kind, i64::from(errno), &reason)
}

/// Converts a provider failure into its response.
#[must_use]
pub fn provider_failure(error: &ProviderError) -> ResponseRecord {
    let kind = match error {
        ProviderError::Value { .. } => FailureKind::DomainValueError,
        ProviderError::System { .. } => FailureKind::DomainSystemError,
    };
    let reason = if error.message().is_empty() {
        kind.default_reason().to_owned()
    } else {
        format!("{} {}", kind.default_reason(), error.message())
    };
    ResponseRecord::failure_with_reason(kind, error.sub_code(), &reason)
}

/// Response for integer input that cannot name an object.
#[must_use]
pub fn invalid_handle_failure(text: &str) -> ResponseRecord {
    let kind = FailureKind::DomainValueError;
    let reason = format!("{} invalid LIN '{text}'", kind.default_reason());
    ResponseRecord::failure_with_reason(kind, i64::from(libc::EINVAL), &reason)
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Record returned by the provider.
    pub info: DomainInfo,
    /// Wall-clock seconds captured right after the lookup.
    pub ref_date: i64,
}

/// Looks up handles through a provider and stamps successful lookups.
pub struct Resolver<P, C> {
    provider: P,
    clock: C,
}

impl<P: DomainProvider, C: Clock> Resolver<P, C> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(provider: P, clock: C) -> Self {
        Self { provider, clock }
    }

    /// Looks up `handle`. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns the `-2` or `-3` response for a provider failure.
    pub fn resolve(&mut self, handle: ObjectHandle) -> Result<Resolved, ResponseRecord> {
        let info = self.provider.domain_info(handle).map_err(|error| {
            debug!(target: RESOLVER_TARGET, %handle, %error, "domain lookup failed");
            provider_failure(&error)
        })?;
        let ref_date = self.clock.now();
        Ok(Resolved { info, ref_date })
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;
    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;

    mock! {
        Provider {}
        impl DomainProvider for Provider {
            fn domain_info(&mut self, handle: ObjectHandle) -> Result<DomainInfo, ProviderError>;
        }
    }

    mock! {
        TestClock {}
        impl Clock for TestClock {
            fn now(&self) -> i64;
        }
    }

    #[test]
    fn successful_lookup_is_stamped_after_the_call() {
        let mut provider = MockProvider::new();
        provider
            .expect_domain_info()
            .with(eq(ObjectHandle::new(12_345)))
            .once()
            .returning(|_| Ok(DomainInfo::default()));
        let mut clock = MockTestClock::new();
        clock.expect_now().once().return_const(1_700_000_000_i64);

        let mut resolver = Resolver::new(provider, clock);
        let resolved = resolver
            .resolve(ObjectHandle::new(12_345))
            .expect("lookup succeeds");
        assert_eq!(resolved.ref_date, 1_700_000_000);
    }

    #[rstest]
    #[case::value(ProviderError::value(Some(22), "bad lin"), "P -2 22 ValueError: bad lin")]
    #[case::value_no_errno(ProviderError::value(None, ""), "P -2 0 ValueError:")]
    #[case::system(
        ProviderError::System { errno: 5, message: String::from("Input/output error") },
        "P -3 5 OSError: Input/output error"
    )]
    fn failed_lookup_is_not_stamped(#[case] error: ProviderError, #[case] expected: &str) {
        let mut provider = MockProvider::new();
        provider
            .expect_domain_info()
            .once()
            .returning(move |_| Err(error.clone()));
        let mut clock = MockTestClock::new();
        clock.expect_now().never();

        let mut resolver = Resolver::new(provider, clock);
        let record = resolver
            .resolve(ObjectHandle::new(1))
            .expect_err("lookup fails");
        assert_eq!(record.to_string(), expected);
    }

    #[test]
    fn missing_path_reports_errno() {
        let record = lstat(Path::new("/no/such/path")).expect_err("path is missing");
        let line = record.to_string();
        assert!(
            line.starts_with(&format!("P -1 {} lstat() error", libc::ENOENT)),
            "unexpected line: {line}"
        );
    }

    #[test]
    fn existing_path_yields_its_inode() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let expected = std::fs::symlink_metadata(file.path())
            .expect("metadata")
            .ino();
        let stat = lstat(file.path()).expect("lstat succeeds");
        assert_eq!(stat.handle, ObjectHandle::new(expected));
    }

    #[test]
    fn invalid_handle_is_a_value_error() {
        assert_eq!(
            invalid_handle_failure("-5").to_string(),
            format!("P -2 {} ValueError: invalid LIN '-5'", libc::EINVAL)
        );
    }
}
