//! Output validation for notegen renderings.
//!
//! [`OutputValidator`] checks a completion against the constraint set of the
//! variant that produced it and returns a [`ValidationOutcome`]. A failed
//! validation is a value, not an error: the raw output always comes back.

#![warn(missing_docs, clippy::pedantic)]

pub mod fabrication;
pub mod markdown;
pub mod outcome;
pub mod validator;

pub use fabrication::{Finding, FindingKind};
pub use outcome::{CheckStatus, ConstraintCheck, ValidationOutcome};
pub use validator::{OutputValidator, missing_sections};
