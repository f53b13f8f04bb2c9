//! Provider serving canned replies from a JSON fixture file.
//!
//! The file is an object keyed by decimal object handles:
//!
//! ```json
//! {
//!   "12345": {"ok": {"domains": [], "worm_ancestors": []}},
//!   "99": {"value_error": {"errno": 22, "message": "bad lin"}},
//!   "7": {"os_error": {"errno": 5}}
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;
use worm_protocol::{DomainInfo, ObjectHandle, ProviderError};

use super::{DomainProvider, ProviderReply};

const FIXTURE_TARGET: &str = "worm_filter::provider::fixture";

/// Errors raised while loading a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The fixture file could not be read.
    #[error("failed to read fixture '{path}': {source}")]
    Read {
        /// Fixture path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The fixture was not valid JSON of the expected shape.
    #[error("failed to parse fixture: {0}")]
    Parse(#[source] serde_json::Error),
    /// A key was not a decimal object handle.
    #[error("fixture key '{key}' is not a decimal object handle")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
}

/// Serves lookups from an in-memory table.
///
/// Handles missing from the table fail with a system error carrying
/// `ENOENT`, the same shape the live provider reports for unknown LINs.
#[derive(Debug, Clone, Default)]
pub struct FixtureDomainProvider {
    replies: HashMap<ObjectHandle, ProviderReply>,
}

impl FixtureDomainProvider {
    /// Loads a fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the file cannot be read or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let provider = Self::from_json(&text)?;
        debug!(
            target: FIXTURE_TARGET,
            path = %path,
            entries = provider.replies.len(),
            "loaded domain fixture"
        );
        Ok(provider)
    }

    /// Parses fixture JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the text is malformed or a key is not
    /// a decimal handle.
    pub fn from_json(text: &str) -> Result<Self, FixtureError> {
        let raw: BTreeMap<String, ProviderReply> =
            serde_json::from_str(text).map_err(FixtureError::Parse)?;
        let replies = raw
            .into_iter()
            .map(|(key, reply)| {
                key.trim()
                    .parse::<u64>()
                    .map(|raw_handle| (ObjectHandle::new(raw_handle), reply))
                    .map_err(|_| FixtureError::InvalidKey { key })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { replies })
    }

    /// Builds a provider from explicit replies.
    #[must_use]
    pub fn from_replies(replies: impl IntoIterator<Item = (ObjectHandle, ProviderReply)>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
        }
    }
}

impl DomainProvider for FixtureDomainProvider {
    fn domain_info(&mut self, handle: ObjectHandle) -> Result<DomainInfo, ProviderError> {
        self.replies
            .get(&handle)
            .cloned()
            .ok_or_else(|| ProviderError::system(libc::ENOENT))?
            .into_result()
    }
}
