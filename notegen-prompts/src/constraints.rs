//! Structural constraints derived from a variant's instruction text.
//!
//! Extraction is keyword driven: each [`ConstraintKind`] owns a list of
//! case-insensitive patterns from the configured vocabulary. Bulleted or
//! numbered directive lines that match nothing are kept as
//! [`Constraint::Advisory`] so that no instruction silently disappears.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use notegen_config::NotegenConfig;
use notegen_config::schema::compile_pattern;
use notegen_primitives::ConstraintKind;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PromptResult;

const DEFAULT_MIN_HEADING_LEVEL: u8 = 2;

/// A single rule that output rendered from a variant must satisfy.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// No `#` heading anywhere in the output.
    NoTopLevelHeading,
    /// Every heading uses at least `level` markers.
    MinHeadingLevel {
        /// Minimum heading depth.
        level: u8,
    },
    /// Output length stays within the tolerance band of the source.
    PreserveLength,
    /// Output may be shorter than the source.
    AllowSummarization,
    /// Output must not introduce entities, links, or facts absent from the source.
    NoFabrication,
    /// Output carries a heading for each listed title.
    RequiredSections {
        /// Canonical section titles.
        sections: BTreeSet<String>,
    },
    /// Gaps are marked with TODOs rather than invented.
    TodoOnGap,
    /// Directive that matched no vocabulary entry; retained for audit only.
    Advisory {
        /// Directive text as written in the variant.
        directive: String,
    },
}

impl Constraint {
    /// Returns the vocabulary kind, or `None` for advisories.
    #[must_use]
    pub fn kind(&self) -> Option<ConstraintKind> {
        Some(match self {
            Self::NoTopLevelHeading => ConstraintKind::NoTopLevelHeading,
            Self::MinHeadingLevel { .. } => ConstraintKind::MinHeadingLevel,
            Self::PreserveLength => ConstraintKind::PreserveLength,
            Self::AllowSummarization => ConstraintKind::AllowSummarization,
            Self::NoFabrication => ConstraintKind::NoFabrication,
            Self::RequiredSections { .. } => ConstraintKind::RequiredSections,
            Self::TodoOnGap => ConstraintKind::TodoOnGap,
            Self::Advisory { .. } => return None,
        })
    }

    /// Returns `true` when failing this constraint blocks routing.
    #[must_use]
    pub fn is_hard(&self) -> bool {
        self.kind().is_some_and(ConstraintKind::is_hard)
    }

    fn advisory(directive: impl Into<String>) -> Self {
        Self::Advisory {
            directive: directive.into(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinHeadingLevel { level } => write!(f, "MIN_HEADING_LEVEL={level}"),
            Self::RequiredSections { sections } => {
                let titles: Vec<&str> = sections.iter().map(String::as_str).collect();
                write!(f, "REQUIRED_SECTIONS={{{}}}", titles.join(", "))
            }
            Self::Advisory { directive } => write!(f, "ADVISORY({directive})"),
            other => match other.kind() {
                Some(kind) => f.write_str(kind.label()),
                None => Ok(()),
            },
        }
    }
}

/// Normalised, ordered set of constraints.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintSet(BTreeSet<Constraint>);

impl ConstraintSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a constraint, collapsing duplicates.
    pub fn insert(&mut self, constraint: Constraint) -> bool {
        self.0.insert(constraint)
    }

    /// Iterates over the constraints in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.0.iter()
    }

    /// Returns the number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the set contains a constraint of `kind`.
    #[must_use]
    pub fn has(&self, kind: ConstraintKind) -> bool {
        self.0.iter().any(|c| c.kind() == Some(kind))
    }

    /// Iterates over the constraints of `kind`, values included.
    pub fn of_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &Constraint> {
        self.0.iter().filter(move |c| c.kind() == Some(kind))
    }

    /// Returns the recognised kinds present in the set.
    #[must_use]
    pub fn kinds(&self) -> BTreeSet<ConstraintKind> {
        self.0.iter().filter_map(Constraint::kind).collect()
    }

    /// Returns the required section titles, if declared.
    #[must_use]
    pub fn required_sections(&self) -> Option<&BTreeSet<String>> {
        self.0.iter().find_map(|c| match c {
            Constraint::RequiredSections { sections } => Some(sections),
            _ => None,
        })
    }

    /// Returns the advisory directives.
    pub fn advisories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|c| match c {
            Constraint::Advisory { directive } => Some(directive.as_str()),
            _ => None,
        })
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::collections::btree_set::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compiled vocabulary turning instruction text into a [`ConstraintSet`].
#[derive(Clone, Debug)]
pub struct ConstraintExtractor {
    rules: Vec<(ConstraintKind, Regex)>,
    sections: Vec<(String, Regex)>,
}

impl ConstraintExtractor {
    /// Compiles the vocabulary and section catalog of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Config`](crate::PromptError::Config) if a pattern
    /// does not compile.
    pub fn from_config(config: &NotegenConfig) -> PromptResult<Self> {
        let mut rules = Vec::new();
        for entry in &config.vocabulary {
            for pattern in &entry.patterns {
                rules.push((entry.constraint, compile_pattern(pattern)?));
            }
        }

        let mut sections = Vec::new();
        for section in &config.sections {
            let alternation = std::iter::once(&section.title)
                .chain(&section.aliases)
                .map(|alias| {
                    alias
                        .split_whitespace()
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(r"\s+")
                })
                .collect::<Vec<_>>()
                .join("|");
            sections.push((
                section.title.clone(),
                compile_pattern(&format!(r"\b(?:{alternation})\b"))?,
            ));
        }

        Ok(Self { rules, sections })
    }

    /// Derives the constraint set declared by `text`.
    ///
    /// Pure: the same text always yields the same set.
    #[must_use]
    pub fn extract(&self, text: &str) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        // Offset of the first match per kind, used to break length conflicts.
        let mut first_seen: BTreeMap<ConstraintKind, usize> = BTreeMap::new();
        let mut min_level: Option<u8> = None;
        let mut sections: BTreeSet<String> = BTreeSet::new();
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let mut recognised = false;

            for (kind, regex) in &self.rules {
                let Some(captures) = regex.captures(line) else {
                    continue;
                };
                recognised = true;
                let position = offset + captures.get(0).map_or(0, |m| m.start());
                first_seen
                    .entry(*kind)
                    .and_modify(|seen| *seen = (*seen).min(position))
                    .or_insert(position);

                match kind {
                    ConstraintKind::MinHeadingLevel => {
                        let level = heading_level(&captures);
                        min_level = Some(min_level.map_or(level, |current| current.max(level)));
                    }
                    ConstraintKind::RequiredSections => {
                        sections.extend(
                            self.sections
                                .iter()
                                .filter(|(_, alias)| alias.is_match(line))
                                .map(|(title, _)| title.clone()),
                        );
                    }
                    _ => {}
                }
            }

            if !recognised {
                if let Some(directive) = directive_text(line) {
                    set.insert(Constraint::advisory(directive));
                }
            }
            offset += line.len();
        }

        for kind in first_seen.keys() {
            let constraint = match kind {
                ConstraintKind::NoTopLevelHeading => Constraint::NoTopLevelHeading,
                ConstraintKind::MinHeadingLevel => Constraint::MinHeadingLevel {
                    level: min_level.unwrap_or(DEFAULT_MIN_HEADING_LEVEL),
                },
                ConstraintKind::PreserveLength => Constraint::PreserveLength,
                ConstraintKind::AllowSummarization => Constraint::AllowSummarization,
                ConstraintKind::NoFabrication => Constraint::NoFabrication,
                ConstraintKind::RequiredSections => {
                    if sections.is_empty() {
                        set.insert(Constraint::advisory(
                            "required sections declared but none recognised",
                        ));
                        continue;
                    }
                    Constraint::RequiredSections {
                        sections: sections.clone(),
                    }
                }
                ConstraintKind::TodoOnGap => Constraint::TodoOnGap,
            };
            set.insert(constraint);
        }

        resolve_length_conflict(&mut set, &first_seen);
        set
    }
}

impl Default for ConstraintExtractor {
    fn default() -> Self {
        Self::from_config(&NotegenConfig::default()).expect("default vocabulary compiles")
    }
}

fn heading_level(captures: &regex::Captures<'_>) -> u8 {
    if let Some(hashes) = captures.name("hashes") {
        return u8::try_from(hashes.as_str().len()).unwrap_or(DEFAULT_MIN_HEADING_LEVEL);
    }
    captures
        .name("level")
        .and_then(|level| level.as_str().parse().ok())
        .unwrap_or(DEFAULT_MIN_HEADING_LEVEL)
}

/// `PRESERVE_LENGTH` and `ALLOW_SUMMARIZATION` are mutually exclusive; the
/// directive written later in the text wins.
fn resolve_length_conflict(set: &mut ConstraintSet, first_seen: &BTreeMap<ConstraintKind, usize>) {
    let (Some(preserve), Some(summarise)) = (
        first_seen.get(&ConstraintKind::PreserveLength),
        first_seen.get(&ConstraintKind::AllowSummarization),
    ) else {
        return;
    };

    let (loser, winner) = if preserve > summarise {
        (Constraint::AllowSummarization, ConstraintKind::PreserveLength)
    } else {
        (Constraint::PreserveLength, ConstraintKind::AllowSummarization)
    };
    set.0.remove(&loser);
    set.insert(Constraint::advisory(format!(
        "{loser} dropped: conflicts with later {winner} directive"
    )));
}

/// Returns the text of a bulleted or numbered line, without its marker.
fn directive_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let body = if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("• "))
    {
        rest
    } else {
        let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        trimmed[digits..]
            .strip_prefix(". ")
            .or_else(|| trimmed[digits..].strip_prefix(") "))?
    };

    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

#[cfg(test)]
mod tests {
    use notegen_config::{SectionSpec, VocabularyEntry};

    use super::*;

    const PUBLIC: &str = "Turn this into a clear, inspiring public-facing markdown page.

Rules:
- Do NOT include a top-level H1 title at the start (the app renders the title separately).
- Start with a short value-focused intro paragraph (no heading).
- Use section headings starting from '##' (H2) and below.
- Keep it crisp and scannable.

Source context:
{{source_notes}}";

    const PRIVATE: &str = "Turn this into exhaustive private notes for the creator.
- Include assumptions, risks, open questions, KPIs, draft milestones.
- Use markdown with '##' and lower. Avoid a top-level H1.

Source context:
{{source_notes}}";

    fn sections(titles: &[&str]) -> BTreeSet<String> {
        titles.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn extracts_public_page_contract() {
        let set = ConstraintExtractor::default().extract(PUBLIC);

        assert!(set.has(ConstraintKind::NoTopLevelHeading));
        assert!(set.has(ConstraintKind::AllowSummarization));
        assert!(!set.has(ConstraintKind::PreserveLength));
        assert!(set.iter().any(|c| *c == Constraint::MinHeadingLevel { level: 2 }));
        let advisories: Vec<&str> = set.advisories().collect();
        assert_eq!(
            advisories,
            ["Start with a short value-focused intro paragraph (no heading)."]
        );
    }

    #[test]
    fn extracts_private_sections() {
        let set = ConstraintExtractor::default().extract(PRIVATE);

        assert_eq!(
            set.required_sections(),
            Some(&sections(&[
                "Assumptions",
                "Draft Milestones",
                "KPIs",
                "Open Questions",
                "Risks",
            ]))
        );
        assert!(set.has(ConstraintKind::NoTopLevelHeading));
        assert!(set.iter().any(|c| *c == Constraint::MinHeadingLevel { level: 2 }));
        assert_eq!(set.advisories().count(), 0);
    }

    #[test]
    fn extraction_is_pure() {
        let extractor = ConstraintExtractor::default();
        let first = extractor.extract(PRIVATE);
        for _ in 0..5 {
            assert_eq!(extractor.extract(PRIVATE), first);
        }
    }

    #[test]
    fn duplicate_directives_collapse() {
        let text = "- Do not invent facts.\n- Never invent names.\n{{source_notes}}";
        let set = ConstraintExtractor::default().extract(text);
        assert_eq!(set.len(), 1);
        assert!(set.has(ConstraintKind::NoFabrication));
    }

    #[test]
    fn later_length_directive_wins() {
        let text = "- Preserve all content, do not shorten.\n- Be crisp and scannable.\n";
        let set = ConstraintExtractor::default().extract(text);
        assert!(set.has(ConstraintKind::AllowSummarization));
        assert!(!set.has(ConstraintKind::PreserveLength));
        assert!(
            set.advisories()
                .any(|a| a.starts_with("PRESERVE_LENGTH dropped"))
        );

        let reversed = "- Be crisp and scannable.\n- Preserve all content, do not shorten.\n";
        let set = ConstraintExtractor::default().extract(reversed);
        assert!(set.has(ConstraintKind::PreserveLength));
        assert!(!set.has(ConstraintKind::AllowSummarization));
    }

    #[test]
    fn heading_level_captured_from_digits() {
        let set = ConstraintExtractor::default().extract("Use headings from H3 downward.");
        assert!(set.iter().any(|c| *c == Constraint::MinHeadingLevel { level: 3 }));
    }

    #[test]
    fn numbered_unknown_directives_become_advisories() {
        let set = ConstraintExtractor::default().extract("1. Write in the second person.\n");
        let advisories: Vec<&str> = set.advisories().collect();
        assert_eq!(advisories, ["Write in the second person."]);
    }

    #[test]
    fn prose_lines_are_not_advisories() {
        let set = ConstraintExtractor::default().extract("Turn this into a page.\n\n{{source_notes}}");
        assert!(set.is_empty());
    }

    #[test]
    fn custom_vocabulary_is_honoured() {
        let mut config = NotegenConfig::default();
        config.vocabulary = vec![VocabularyEntry::new(
            ConstraintKind::RequiredSections,
            [r"\bsections\s*:"],
        )];
        config.sections = vec![SectionSpec::new("Pricing", ["pricing", "cost"])];
        let extractor = ConstraintExtractor::from_config(&config).unwrap();

        let set = extractor.extract("- Sections: cost and timeline.\n- Do not invent facts.");
        assert_eq!(set.required_sections(), Some(&sections(&["Pricing"])));
        assert!(!set.has(ConstraintKind::NoFabrication));
        assert_eq!(set.advisories().collect::<Vec<_>>(), ["Do not invent facts."]);
    }

    #[test]
    fn display_uses_vocabulary_labels() {
        let rendered: Vec<String> = ConstraintExtractor::default()
            .extract(PRIVATE)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(rendered.contains(&"NO_TOP_LEVEL_HEADING".to_owned()));
        assert!(rendered.contains(&"MIN_HEADING_LEVEL=2".to_owned()));
    }
}
