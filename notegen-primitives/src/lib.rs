//! Core shared types for the notegen prompt rendering layer.

#![warn(missing_docs, clippy::pedantic)]

mod category;
mod constraint;
mod error;
mod family;
mod ids;

/// Public/private classification of a template family.
pub use category::Category;
/// Vocabulary of recognised constraint kinds.
pub use constraint::ConstraintKind;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Stable identifier of a template family.
pub use family::FamilyKey;
/// Correlation identifier attached to each rendering request.
pub use ids::RequestId;
