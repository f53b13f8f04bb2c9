use crate::logging::LogFormat;
use crate::provider::ProviderKind;

/// Default log filter expression used by the binaries.
///
/// Per-request events are logged at `debug`, so the default keeps stderr
/// quiet during multi-million object walks.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Interpreter used to host the `isi.fs.domain` helper.
pub const DEFAULT_PYTHON_BINARY: &str = "/usr/bin/python";

/// Filter executable spawned by the audit driver.
pub const DEFAULT_FILTER_COMMAND: &str = "worm-filter";

/// Number of lookups after which the audit driver restarts its filter.
pub const DEFAULT_REJUVENATE_AFTER: u64 = 50_000;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::default()
}

/// Default metadata provider.
#[must_use]
pub fn default_provider() -> ProviderKind {
    ProviderKind::default()
}

/// Owned interpreter path for serde defaults.
#[must_use]
pub fn default_python_binary() -> String {
    DEFAULT_PYTHON_BINARY.to_owned()
}

/// Owned filter command for serde defaults.
#[must_use]
pub fn default_filter_command() -> String {
    DEFAULT_FILTER_COMMAND.to_owned()
}

/// Rejuvenation interval for serde defaults.
#[must_use]
pub const fn default_rejuvenate_after() -> u64 {
    DEFAULT_REJUVENATE_AFTER
}
