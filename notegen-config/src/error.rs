//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {source}")]
    Parse {
        /// Source parse error.
        #[from]
        source: toml::de::Error,
    },
    /// A value failed validation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Human-readable reason for rejection.
        reason: String,
    },
    /// A vocabulary pattern is not a valid regular expression.
    #[error("invalid vocabulary pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Source regex compile error.
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
