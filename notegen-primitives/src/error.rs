//! Shared error definitions for notegen primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the workspace primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided request identifier could not be parsed.
    #[error("invalid request id: {source}")]
    InvalidRequestId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Family key failed validation.
    #[error("invalid family key `{key}`: {reason}")]
    InvalidFamilyKey {
        /// The offending key string.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Category label was not `public` or `private`.
    #[error("invalid category `{0}`: expected `public` or `private`")]
    InvalidCategory(String),
}
