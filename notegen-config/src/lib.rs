//! Configuration management for notegen.
//!
//! The [`schema`] module defines the typed configuration surface (length
//! tolerance, constraint vocabulary, section catalog, completion and retry
//! settings); [`loader`] reads it from TOML and the environment.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    CompletionConfig, NotegenConfig, RetryConfig, SectionSpec, ValidationConfig, VocabularyEntry,
};
