//! Validation outcome types returned by the output validator.

use notegen_prompts::Constraint;
use serde::Serialize;

/// Result of checking one constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    /// The output satisfies the constraint.
    Passed,
    /// The output violates the constraint.
    Failed {
        /// What was wrong.
        reason: String,
    },
    /// Nothing failed, but a human should look at the listed notes.
    Flagged {
        /// Review notes.
        notes: Vec<String>,
    },
    /// The constraint could not or need not be checked mechanically.
    Unchecked {
        /// Why no check was made.
        reason: String,
    },
}

impl CheckStatus {
    /// Returns a failed status.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Returns an unchecked status.
    #[must_use]
    pub fn unchecked(reason: impl Into<String>) -> Self {
        Self::Unchecked {
            reason: reason.into(),
        }
    }
}

/// A constraint paired with its check status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintCheck {
    constraint: Constraint,
    #[serde(flatten)]
    status: CheckStatus,
}

impl ConstraintCheck {
    /// Creates a check record.
    #[must_use]
    pub fn new(constraint: Constraint, status: CheckStatus) -> Self {
        Self { constraint, status }
    }

    /// Returns the checked constraint.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> &CheckStatus {
        &self.status
    }

    /// Returns `true` when a hard constraint failed.
    #[must_use]
    pub fn is_violation(&self) -> bool {
        self.constraint.is_hard() && matches!(self.status, CheckStatus::Failed { .. })
    }

    /// Returns a one-line, human-readable summary.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.status {
            CheckStatus::Passed => format!("{}: passed", self.constraint),
            CheckStatus::Failed { reason } => format!("{}: {reason}", self.constraint),
            CheckStatus::Flagged { notes } => format!("{}: {}", self.constraint, notes.join("; ")),
            CheckStatus::Unchecked { reason } => {
                format!("{}: unchecked ({reason})", self.constraint)
            }
        }
    }
}

/// Structured verdict on one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    passed: bool,
    checks: Vec<ConstraintCheck>,
    output: String,
}

impl ValidationOutcome {
    /// Builds an outcome; it passes iff no hard constraint failed.
    #[must_use]
    pub fn new(checks: Vec<ConstraintCheck>, output: impl Into<String>) -> Self {
        let passed = !checks.iter().any(ConstraintCheck::is_violation);
        Self {
            passed,
            checks,
            output: output.into(),
        }
    }

    /// Returns `true` when every hard constraint held.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        self.passed
    }

    /// Returns every check, in constraint order.
    #[must_use]
    pub fn checks(&self) -> &[ConstraintCheck] {
        &self.checks
    }

    /// Returns the checks that failed a hard constraint.
    pub fn violations(&self) -> impl Iterator<Item = &ConstraintCheck> {
        self.checks.iter().filter(|check| check.is_violation())
    }

    /// Returns the constraints that were violated.
    #[must_use]
    pub fn violated_constraints(&self) -> Vec<&Constraint> {
        self.violations().map(ConstraintCheck::constraint).collect()
    }

    /// Returns flagged and unchecked checks, which travel with deliveries.
    pub fn warnings(&self) -> impl Iterator<Item = &ConstraintCheck> {
        self.checks.iter().filter(|check| {
            matches!(
                check.status,
                CheckStatus::Flagged { .. } | CheckStatus::Unchecked { .. }
            )
        })
    }

    /// Returns the raw completion text.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes the outcome and returns the raw completion text.
    #[must_use]
    pub fn into_output(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_failures_do_not_fail_the_outcome() {
        let outcome = ValidationOutcome::new(
            vec![
                ConstraintCheck::new(Constraint::NoTopLevelHeading, CheckStatus::Passed),
                ConstraintCheck::new(
                    Constraint::NoFabrication,
                    CheckStatus::Flagged {
                        notes: vec!["possible fabrication (number): 2025".into()],
                    },
                ),
                ConstraintCheck::new(Constraint::TodoOnGap, CheckStatus::unchecked("informational")),
            ],
            "## Body",
        );

        assert!(outcome.is_pass());
        assert_eq!(outcome.violations().count(), 0);
        assert_eq!(outcome.warnings().count(), 2);
    }

    #[test]
    fn hard_failure_fails_the_outcome() {
        let outcome = ValidationOutcome::new(
            vec![ConstraintCheck::new(
                Constraint::NoTopLevelHeading,
                CheckStatus::failed("line 1 is a level-1 heading"),
            )],
            "# Title",
        );

        assert!(!outcome.is_pass());
        assert_eq!(outcome.violated_constraints(), [&Constraint::NoTopLevelHeading]);
        assert_eq!(
            outcome.checks()[0].describe(),
            "NO_TOP_LEVEL_HEADING: line 1 is a level-1 heading"
        );
        assert_eq!(outcome.into_output(), "# Title");
    }
}
