//! Error types for spark-groups

use thiserror::Error;

/// A grouped collection could not be built from the given configuration.
///
/// Raised before any subscription is made, so a failed build leaves nothing
/// behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("missing collection")]
    MissingCollection,

    #[error("missing groupBy")]
    MissingGroupBy,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigurationError>;
