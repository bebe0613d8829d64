//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a usable [`HivemindSettings`](crate::HivemindSettings) could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// The settings file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not JSON, or a value has the wrong type.
    #[error("{} is not a valid settings file: {source}", .path.display())]
    Parse {
        /// The settings file.
        path: PathBuf,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },

    /// A value the client cannot connect with.
    #[error("{key} {reason}")]
    InvalidValue {
        /// Dotted settings key or environment variable name.
        key: &'static str,
        /// What an acceptable value looks like.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
