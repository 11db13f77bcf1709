//! Prompt template families for notegen.
//!
//! Templates are stored as append-only variant histories ([`store`]),
//! resolved last-registered-wins ([`resolver`]), bound to creator notes
//! ([`binder`]), and mined for the structural constraints their output must
//! satisfy ([`constraints`]).

#![warn(missing_docs, clippy::pedantic)]

pub mod binder;
pub mod builtin;
pub mod constraints;
mod error;
pub mod files;
pub mod resolver;
pub mod source;
pub mod store;

pub use binder::{SOURCE_PLACEHOLDER, bind, bind_text};
pub use constraints::{Constraint, ConstraintExtractor, ConstraintSet};
pub use error::{PromptError, PromptResult};
pub use resolver::{Override, OverrideChange, Resolution, VariantResolver};
pub use source::SourceNotes;
pub use store::{TemplateStore, Variant};
