//! Checks a completion against the constraints of the variant that produced it.

use std::collections::BTreeSet;

use notegen_config::{NotegenConfig, ValidationConfig};
use notegen_prompts::{Constraint, ConstraintSet};
use tracing::debug;

use crate::fabrication;
use crate::markdown::{Heading, headings, normalise_title};
use crate::outcome::{CheckStatus, ConstraintCheck, ValidationOutcome};

/// Validates completion output against a [`ConstraintSet`].
#[derive(Debug, Clone, Default)]
pub struct OutputValidator {
    config: ValidationConfig,
}

impl OutputValidator {
    /// Creates a validator with explicit thresholds.
    #[must_use]
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Creates a validator from the `[validation]` table.
    #[must_use]
    pub fn from_config(config: &NotegenConfig) -> Self {
        Self::new(config.validation.clone())
    }

    /// Returns the thresholds in use.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Checks `output` against every constraint in `constraints`.
    ///
    /// `source` is the unbound creator notes; checks that compare against the
    /// source are reported unchecked when it is absent.
    #[must_use]
    pub fn validate(
        &self,
        output: &str,
        constraints: &ConstraintSet,
        source: Option<&str>,
    ) -> ValidationOutcome {
        let found = headings(output);
        let checks: Vec<ConstraintCheck> = constraints
            .iter()
            .map(|constraint| {
                let status = self.check(constraint, output, &found, source);
                ConstraintCheck::new(constraint.clone(), status)
            })
            .collect();

        let outcome = ValidationOutcome::new(checks, output);
        debug!(
            passed = outcome.is_pass(),
            violations = outcome.violations().count(),
            warnings = outcome.warnings().count(),
            "output validated"
        );
        outcome
    }

    fn check(
        &self,
        constraint: &Constraint,
        output: &str,
        found: &[Heading],
        source: Option<&str>,
    ) -> CheckStatus {
        match constraint {
            Constraint::NoTopLevelHeading => check_min_level(found, 2, "level-1 heading"),
            Constraint::MinHeadingLevel { level } => {
                check_min_level(found, *level, "heading above the minimum level")
            }
            Constraint::PreserveLength => self.check_length(output, source),
            Constraint::AllowSummarization => self.check_truncation(output, source),
            Constraint::NoFabrication => match source {
                Some(source) => {
                    let findings = fabrication::scan(output, source);
                    if findings.is_empty() {
                        CheckStatus::Passed
                    } else {
                        CheckStatus::Flagged {
                            notes: findings.iter().map(ToString::to_string).collect(),
                        }
                    }
                }
                None => CheckStatus::unchecked("no source text supplied"),
            },
            Constraint::RequiredSections { sections } => {
                let missing = missing_from(found, sections);
                if missing.is_empty() {
                    CheckStatus::Passed
                } else {
                    CheckStatus::failed(format!("missing sections: {}", missing.join(", ")))
                }
            }
            Constraint::TodoOnGap => CheckStatus::unchecked("gap marking is informational"),
            Constraint::Advisory { .. } => CheckStatus::unchecked("advisory directive"),
        }
    }

    fn check_length(&self, output: &str, source: Option<&str>) -> CheckStatus {
        let Some(source_len) = source.map(char_len).filter(|len| *len > 0) else {
            return CheckStatus::unchecked("no source text supplied");
        };
        let output_len = char_len(output);
        let ratio = output_len * 100;
        let min = u64::from(self.config.min_percent()) * source_len;
        let max = u64::from(self.config.max_percent()) * source_len;

        if (min..=max).contains(&ratio) {
            CheckStatus::Passed
        } else {
            CheckStatus::failed(format!(
                "output is {}% of source length, expected {}-{}%",
                ratio / source_len,
                self.config.min_percent(),
                self.config.max_percent()
            ))
        }
    }

    fn check_truncation(&self, output: &str, source: Option<&str>) -> CheckStatus {
        let Some(source_len) = source.map(char_len).filter(|len| *len > 0) else {
            return CheckStatus::Passed;
        };
        let ratio = char_len(output) * 100;
        if ratio < u64::from(self.config.truncation_floor) * source_len {
            CheckStatus::Flagged {
                notes: vec![format!(
                    "output is {}% of source length, possibly truncated",
                    ratio / source_len
                )],
            }
        } else {
            CheckStatus::Passed
        }
    }
}

/// Returns the titles from `titles` that have no matching heading in `output`.
///
/// Matching ignores case, emphasis markers, and surrounding punctuation.
#[must_use]
pub fn missing_sections<'a, I>(output: &str, titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    missing_from(&headings(output), titles)
}

fn missing_from<'a, I>(found: &[Heading], titles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let present: BTreeSet<String> = found.iter().map(|h| normalise_title(&h.text)).collect();
    titles
        .into_iter()
        .filter(|title| !present.contains(&normalise_title(title)))
        .cloned()
        .collect()
}

fn check_min_level(found: &[Heading], min: u8, what: &str) -> CheckStatus {
    let offending: Vec<String> = found
        .iter()
        .filter(|heading| heading.level < min)
        .map(|heading| format!("line {}", heading.line + 1))
        .collect();
    if offending.is_empty() {
        CheckStatus::Passed
    } else {
        CheckStatus::failed(format!("{what} at {}", offending.join(", ")))
    }
}

fn char_len(text: &str) -> u64 {
    text.chars().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(constraints: impl IntoIterator<Item = Constraint>) -> ConstraintSet {
        constraints.into_iter().collect()
    }

    fn status(outcome: &ValidationOutcome, constraint: &Constraint) -> CheckStatus {
        outcome
            .checks()
            .iter()
            .find(|check| check.constraint() == constraint)
            .map(|check| check.status().clone())
            .expect("check present")
    }

    fn private_sections() -> Constraint {
        Constraint::RequiredSections {
            sections: ValidationConfig::default()
                .private_sections
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn leading_h1_fails_h2_passes() {
        let validator = OutputValidator::default();
        let constraints = set([Constraint::NoTopLevelHeading]);

        assert!(!validator.validate("# Title\n\nBody", &constraints, None).is_pass());
        assert!(validator.validate("## Section\n\nBody", &constraints, None).is_pass());
    }

    #[test]
    fn setext_title_counts_as_h1() {
        let validator = OutputValidator::default();
        let constraints = set([Constraint::NoTopLevelHeading]);
        assert!(!validator.validate("Title\n=====\n", &constraints, None).is_pass());
    }

    #[test]
    fn min_heading_level_reports_offending_lines() {
        let validator = OutputValidator::default();
        let constraint = Constraint::MinHeadingLevel { level: 3 };
        let outcome = validator.validate("### ok\n## too high", &set([constraint.clone()]), None);

        assert!(!outcome.is_pass());
        assert_eq!(
            status(&outcome, &constraint),
            CheckStatus::failed("heading above the minimum level at line 2")
        );
    }

    #[test]
    fn preserve_length_band() {
        let validator = OutputValidator::default();
        let constraints = set([Constraint::PreserveLength]);
        let source = "x".repeat(100);

        let half = "y".repeat(50);
        let near = "y".repeat(95);
        assert!(!validator.validate(&half, &constraints, Some(&source)).is_pass());
        assert!(validator.validate(&near, &constraints, Some(&source)).is_pass());
    }

    #[test]
    fn preserve_length_without_source_is_unchecked() {
        let validator = OutputValidator::default();
        let outcome = validator.validate("text", &set([Constraint::PreserveLength]), None);

        assert!(outcome.is_pass());
        assert!(matches!(
            status(&outcome, &Constraint::PreserveLength),
            CheckStatus::Unchecked { .. }
        ));
    }

    #[test]
    fn summarization_flags_suspected_truncation() {
        let validator = OutputValidator::default();
        let constraints = set([Constraint::AllowSummarization]);
        let source = "x".repeat(1000);

        let outcome = validator.validate("tiny", &constraints, Some(&source));
        assert!(outcome.is_pass());
        assert!(matches!(
            status(&outcome, &Constraint::AllowSummarization),
            CheckStatus::Flagged { .. }
        ));

        let outcome = validator.validate(&"y".repeat(300), &constraints, Some(&source));
        assert_eq!(status(&outcome, &Constraint::AllowSummarization), CheckStatus::Passed);
    }

    #[test]
    fn fabrication_is_flagged_never_failed() {
        let validator = OutputValidator::default();
        let constraints = set([Constraint::NoFabrication]);
        let outcome = validator.validate(
            "## Launch\n\nShips on 2031-04-01 via https://launch.invalid.",
            &constraints,
            Some("a small tool"),
        );

        assert!(outcome.is_pass());
        assert!(matches!(
            status(&outcome, &Constraint::NoFabrication),
            CheckStatus::Flagged { .. }
        ));
    }

    #[test]
    fn missing_open_questions_fails_required_sections() {
        let validator = OutputValidator::default();
        let constraint = private_sections();
        let output = "## Assumptions\n## Risks\n## KPIs\n## Draft Milestones\n";
        let outcome = validator.validate(output, &set([constraint.clone()]), None);

        assert!(!outcome.is_pass());
        assert_eq!(
            status(&outcome, &constraint),
            CheckStatus::failed("missing sections: Open Questions")
        );
    }

    #[test]
    fn required_sections_ignore_case_and_emphasis() {
        let validator = OutputValidator::default();
        let output = "## assumptions\n## **Risks**\n## KPIs:\n## Draft milestones\n### Open Questions";
        assert!(validator.validate(output, &set([private_sections()]), None).is_pass());
    }

    #[test]
    fn informational_constraints_are_unchecked() {
        let validator = OutputValidator::default();
        let advisory = Constraint::Advisory {
            directive: "Keep it crisp and scannable.".into(),
        };
        let outcome = validator.validate("body", &set([Constraint::TodoOnGap, advisory]), None);

        assert!(outcome.is_pass());
        assert_eq!(outcome.warnings().count(), 2);
    }

    #[test]
    fn missing_sections_helper() {
        let titles = vec!["Risks".to_owned(), "KPIs".to_owned()];
        assert_eq!(missing_sections("## Risks\n\ntext", &titles), ["KPIs"]);
    }
}
