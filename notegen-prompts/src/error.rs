//! Error types for template operations.

use std::path::PathBuf;

use notegen_config::ConfigError;
use notegen_primitives::Category;
use thiserror::Error;

/// Errors raised before any completion call is made.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No variant was ever registered under the key.
    #[error("unknown template family `{family}`")]
    UnknownFamily {
        /// Requested family key.
        family: String,
    },

    /// A registration disagreed with the category fixed at family creation.
    #[error("family `{family}` is {existing}, registration supplied {requested}")]
    CategoryMismatch {
        /// Family key.
        family: String,
        /// Category fixed when the family was created.
        existing: Category,
        /// Category supplied by the rejected registration.
        requested: Category,
    },

    /// The variant text does not contain exactly one placeholder.
    #[error("malformed variant: {reason}")]
    MalformedVariant {
        /// Why the variant was rejected.
        reason: String,
    },

    /// The source notes were empty or whitespace-only.
    #[error("source notes are empty")]
    EmptyContext,

    /// A family key or category label failed validation.
    #[error(transparent)]
    Primitive(#[from] notegen_primitives::Error),

    /// The constraint vocabulary could not be compiled.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A template source file could not be read.
    #[error("failed to read template file {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A template source file is structurally invalid.
    #[error("invalid template file {path}: {reason}")]
    TemplateFile {
        /// File being parsed.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

impl PromptError {
    /// Convenience constructor for unknown families.
    #[must_use]
    pub fn unknown_family(family: impl Into<String>) -> Self {
        Self::UnknownFamily {
            family: family.into(),
        }
    }

    /// Convenience constructor for malformed variants.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedVariant {
            reason: reason.into(),
        }
    }
}

/// Result alias for template operations.
pub type PromptResult<T> = Result<T, PromptError>;
