//! Metadata providers answering domain-info lookups.
//!
//! The filter talks to providers through [`DomainProvider`] so the request
//! loop stays deterministic under test. Production runs use
//! [`PythonDomainProvider`], which keeps one `isi.fs.domain` helper process
//! alive for the whole session; off-cluster runs use
//! [`FixtureDomainProvider`], which serves canned replies from a JSON file.

mod fixture;
mod python;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use worm_config::{Config, ProviderKind};
use worm_protocol::{DomainInfo, ObjectHandle, ProviderError};

pub use fixture::{FixtureDomainProvider, FixtureError};
pub use python::PythonDomainProvider;

/// Source of domain-info records.
pub trait DomainProvider {
    /// Looks up the domain info for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Value`] when the provider rejects the handle
    /// and [`ProviderError::System`] when the lookup fails at the OS level.
    fn domain_info(&mut self, handle: ObjectHandle) -> Result<DomainInfo, ProviderError>;
}

impl<P: DomainProvider + ?Sized> DomainProvider for Box<P> {
    fn domain_info(&mut self, handle: ObjectHandle) -> Result<DomainInfo, ProviderError> {
        (**self).domain_info(handle)
    }
}

/// One provider answer as carried over JSON.
///
/// The Python helper writes exactly one of these per line, and fixture
/// files map handles to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderReply {
    /// Successful lookup.
    Ok(DomainInfo),
    /// The provider rejected the handle.
    ValueError(ReplyError),
    /// The provider failed at the OS level.
    OsError(ReplyError),
}

/// Error payload of a [`ProviderReply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    /// Errno reported by the provider.
    #[serde(default)]
    pub errno: Option<i32>,
    /// Provider-supplied description.
    #[serde(default)]
    pub message: String,
}

impl ProviderReply {
    /// Converts the reply into a lookup result.
    ///
    /// OS errors without an errno are reported as `EIO`.
    ///
    /// # Errors
    ///
    /// Returns the provider error carried by a failure reply.
    pub fn into_result(self) -> Result<DomainInfo, ProviderError> {
        match self {
            Self::Ok(info) => Ok(info),
            Self::ValueError(error) => Err(ProviderError::value(error.errno, error.message)),
            Self::OsError(error) => {
                let errno = error.errno.unwrap_or(libc::EIO);
                Err(if error.message.is_empty() {
                    ProviderError::system(errno)
                } else {
                    ProviderError::System {
                        errno,
                        message: error.message,
                    }
                })
            }
        }
    }
}

/// Errors raised while constructing the configured provider.
#[derive(Debug, Error)]
pub enum ProviderSetupError {
    /// The fixture file could not be loaded.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// The fixture provider was selected without a fixture file.
    #[error("provider 'fixture' requires a fixture path")]
    MissingFixturePath,
}

/// Builds the provider selected by `config`.
///
/// # Errors
///
/// Returns an error when the fixture provider is selected and its file is
/// missing or malformed. The Python provider starts its helper lazily and
/// never fails here.
pub fn build_provider(config: &Config) -> Result<Box<dyn DomainProvider>, ProviderSetupError> {
    match config.provider() {
        ProviderKind::Python => Ok(Box::new(PythonDomainProvider::new(config.python_binary()))),
        ProviderKind::Fixture => {
            let path = config
                .fixture_path()
                .ok_or(ProviderSetupError::MissingFixturePath)?;
            Ok(Box::new(FixtureDomainProvider::load(path)?))
        }
    }
}

#[cfg(test)]
mod tests;
