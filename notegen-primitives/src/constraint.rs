//! Names of the structural constraints a variant may declare.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed vocabulary of constraint kinds recognised in instruction text.
///
/// The configuration maps each kind to the phrases that declare it; the
/// prompt layer turns matches into concrete constraints.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Output must not contain a level-one heading.
    NoTopLevelHeading,
    /// Headings must use at least a given number of `#` markers.
    MinHeadingLevel,
    /// Output length must stay within the configured tolerance band.
    PreserveLength,
    /// Output may be shorter than its source.
    AllowSummarization,
    /// Output must not introduce facts absent from the source.
    NoFabrication,
    /// Output must contain a fixed set of section headings.
    RequiredSections,
    /// Gaps must be marked with TODOs rather than invented.
    TodoOnGap,
}

impl ConstraintKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 7] = [
        Self::NoTopLevelHeading,
        Self::MinHeadingLevel,
        Self::PreserveLength,
        Self::AllowSummarization,
        Self::NoFabrication,
        Self::RequiredSections,
        Self::TodoOnGap,
    ];

    /// Returns the upper-case label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoTopLevelHeading => "NO_TOP_LEVEL_HEADING",
            Self::MinHeadingLevel => "MIN_HEADING_LEVEL",
            Self::PreserveLength => "PRESERVE_LENGTH",
            Self::AllowSummarization => "ALLOW_SUMMARIZATION",
            Self::NoFabrication => "NO_FABRICATION",
            Self::RequiredSections => "REQUIRED_SECTIONS",
            Self::TodoOnGap => "TODO_ON_GAP",
        }
    }

    /// Returns `true` for constraints whose failure blocks routing.
    #[must_use]
    pub const fn is_hard(self) -> bool {
        !matches!(self, Self::NoFabrication | Self::TodoOnGap)
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
