use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Selects the backend that answers domain-info lookups.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ProviderKind {
    /// Long-lived Python helper that queries `isi.fs.domain` on the cluster.
    #[default]
    Python,
    /// Canned records read from a JSON fixture file.
    Fixture,
}

/// Errors encountered while parsing a [`ProviderKind`] from text.
pub type ProviderKindParseError = strum::ParseError;
