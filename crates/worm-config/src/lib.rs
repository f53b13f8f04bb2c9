//! Shared configuration for the WORM retention filter and its audit driver.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file (`--config-path` or `WORM_FILTER_CONFIG_PATH`), then
//! `WORM_FILTER_*` environment variables, then command-line flags. Both
//! binaries load the same [`Config`] so the audit driver and the filter it
//! spawns agree on provider selection and logging.

use std::ffi::OsString;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod defaults;
mod logging;
mod provider;

pub use defaults::{
    DEFAULT_FILTER_COMMAND, DEFAULT_LOG_FILTER, DEFAULT_PYTHON_BINARY, DEFAULT_REJUVENATE_AFTER,
    default_filter_command, default_log_filter, default_log_filter_string, default_log_format,
    default_provider, default_python_binary, default_rejuvenate_after,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use provider::{ProviderKind, ProviderKindParseError};

/// Command-line flags owned by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of [`Config`]. Binaries use
/// this list to partition their arguments before handing the configuration
/// subset to [`Config::load_from_iter`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--provider",
    "--python-binary",
    "--fixture-path",
    "--filter-command",
    "--rejuvenate-after",
];

/// Runtime configuration shared by `worm-filter` and `worm-audit`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "WORM_FILTER")]
pub struct Config {
    /// `tracing` filter expression applied to stderr diagnostics.
    #[ortho_config(default = defaults::default_log_filter_string())]
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for stderr diagnostics.
    #[ortho_config(default = defaults::default_log_format())]
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Backend answering domain-info lookups.
    #[ortho_config(default = defaults::default_provider())]
    #[serde(default = "defaults::default_provider")]
    pub provider: ProviderKind,
    /// Interpreter hosting the `isi.fs.domain` helper.
    #[ortho_config(default = defaults::default_python_binary())]
    #[serde(default = "defaults::default_python_binary")]
    pub python_binary: String,
    /// JSON fixture consulted by the fixture provider.
    #[serde(default)]
    pub fixture_path: Option<Utf8PathBuf>,
    /// Filter executable spawned by the audit driver.
    #[ortho_config(default = defaults::default_filter_command())]
    #[serde(default = "defaults::default_filter_command")]
    pub filter_command: String,
    /// Lookups served by one filter process before the audit driver
    /// replaces it.
    #[ortho_config(default = defaults::default_rejuvenate_after())]
    #[serde(default = "defaults::default_rejuvenate_after")]
    pub rejuvenate_after: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            provider: default_provider(),
            python_binary: default_python_binary(),
            fixture_path: None,
            filter_command: default_filter_command(),
            rejuvenate_after: default_rejuvenate_after(),
        }
    }
}

impl Config {
    /// Loads configuration from an explicit argument list and the
    /// environment.
    ///
    /// `args` must start with the program name and hold only flags listed in
    /// [`CONFIG_CLI_FLAGS`].
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is malformed, or a
    /// validation error from [`Config::validate`].
    pub fn load_validated_from(args: &[OsString]) -> Result<Self, ConfigError> {
        let config = Self::load_from_iter(args.iter().cloned()).map_err(ConfigError::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints the loader cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFixturePath`] when the fixture provider
    /// is selected without a fixture file, and
    /// [`ConfigError::ZeroRejuvenation`] when the rejuvenation interval is 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == ProviderKind::Fixture && self.fixture_path.is_none() {
            return Err(ConfigError::MissingFixturePath);
        }
        if self.rejuvenate_after == 0 {
            return Err(ConfigError::ZeroRejuvenation);
        }
        Ok(())
    }

    /// Filter expression for stderr diagnostics.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Format for stderr diagnostics.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Selected metadata provider.
    #[must_use]
    pub const fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Interpreter hosting the Python helper.
    #[must_use]
    pub fn python_binary(&self) -> &str {
        self.python_binary.as_str()
    }

    /// Fixture file, when configured.
    #[must_use]
    pub fn fixture_path(&self) -> Option<&Utf8Path> {
        self.fixture_path.as_deref()
    }

    /// Filter executable used by the audit driver.
    #[must_use]
    pub fn filter_command(&self) -> &str {
        self.filter_command.as_str()
    }

    /// Lookups per filter process before rejuvenation.
    #[must_use]
    pub const fn rejuvenate_after(&self) -> u64 {
        self.rejuvenate_after
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more configuration layers failed to load.
    #[error("failed to load configuration: {0}")]
    Load(Arc<OrthoError>),
    /// The fixture provider needs a fixture file.
    #[error("provider 'fixture' requires --fixture-path")]
    MissingFixturePath,
    /// A rejuvenation interval of zero would restart before every lookup.
    #[error("rejuvenate_after must be greater than zero")]
    ZeroRejuvenation,
}
