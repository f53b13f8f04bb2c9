//! Structured diagnostics on stderr.
//!
//! Both binaries share a stdout-owning peer: the walker reads the filter's
//! stdout, and the audit CSV goes to the audit driver's. Every event
//! therefore goes to stderr, tagged with the binary that produced it so
//! interleaved filter and driver diagnostics stay distinguishable.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::debug;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use worm_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = "worm_filter::telemetry";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber for `binary` on first use; later calls
/// are no-ops.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter expression is invalid or
/// another subscriber is already installed.
pub fn initialise(config: &Config, binary: &'static str) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| {
            install_subscriber(config)?;
            debug!(
                target: TELEMETRY_TARGET,
                binary,
                pid = std::process::id(),
                format = %config.log_format(),
                filter = config.log_filter(),
                "diagnostics routed to stderr"
            );
            Ok(())
        })
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let subscriber = Registry::default()
        .with(filter)
        .with(stderr_layer(config.log_format()));
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Event formatter writing to stderr in the configured format.
fn stderr_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let timer = UtcTime::rfc_3339();
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_timer(timer)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_timer(timer)
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_rejected_before_install() {
        let config = Config {
            log_filter: String::from("worm_filter=notalevel"),
            ..Config::default()
        };
        assert!(matches!(
            install_subscriber(&config),
            Err(TelemetryError::Filter(_))
        ));
    }

    #[test]
    fn both_formats_build_a_layer() {
        for format in [LogFormat::Json, LogFormat::Compact] {
            let subscriber = Registry::default().with(stderr_layer(format));
            tracing::subscriber::with_default(subscriber, || {
                debug!(target: TELEMETRY_TARGET, "format check");
            });
        }
    }
}
