//! Strongly typed configuration schema.

use std::collections::BTreeSet;
use std::time::Duration;

use notegen_primitives::ConstraintKind;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Root configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotegenConfig {
    /// Output validation thresholds.
    pub validation: ValidationConfig,
    /// Phrase patterns declaring each constraint kind.
    pub vocabulary: Vec<VocabularyEntry>,
    /// Catalog of section titles recognised in `REQUIRED_SECTIONS` directives.
    pub sections: Vec<SectionSpec>,
    /// Completion service settings.
    pub completion: CompletionConfig,
    /// Caller-level retry policy for completion calls.
    pub retry: RetryConfig,
}

impl Default for NotegenConfig {
    fn default() -> Self {
        Self {
            validation: ValidationConfig::default(),
            vocabulary: default_vocabulary(),
            sections: default_sections(),
            completion: CompletionConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl NotegenConfig {
    /// Adds the default patterns for every constraint kind the vocabulary
    /// does not mention. Listing a kind with an empty pattern list disables it.
    pub fn fill_vocabulary_defaults(&mut self) {
        let present: BTreeSet<ConstraintKind> =
            self.vocabulary.iter().map(|entry| entry.constraint).collect();
        for entry in default_vocabulary() {
            if !present.contains(&entry.constraint) {
                self.vocabulary.push(entry);
            }
        }
    }

    /// Returns the patterns configured for `kind`, in declaration order.
    pub fn patterns_for(&self, kind: ConstraintKind) -> impl Iterator<Item = &str> {
        self.vocabulary
            .iter()
            .filter(move |entry| entry.constraint == kind)
            .flat_map(|entry| entry.patterns.iter().map(String::as_str))
    }

    /// Validates the whole document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for out-of-range values and
    /// [`ConfigError::Pattern`] when a vocabulary or alias pattern fails to compile.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validation.validate()?;
        self.completion.validate()?;
        self.retry.validate()?;

        for pattern in self.vocabulary.iter().flat_map(|entry| &entry.patterns) {
            compile_pattern(pattern)?;
        }

        for section in &self.sections {
            if section.title.trim().is_empty() {
                return Err(ConfigError::invalid("section titles cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Compiles a vocabulary pattern the way the extractor will use it.
///
/// # Errors
///
/// Returns [`ConfigError::Pattern`] if the pattern is not a valid regex.
pub fn compile_pattern(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(&format!("(?i){pattern}")).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// Thresholds applied by the output validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accepted output length as `[min, max]` percent of the source length.
    pub tolerance_band: [u32; 2],
    /// Output shorter than this percent of the source is flagged as likely truncation.
    pub truncation_floor: u32,
    /// Headings every private rendering must contain before it is routed.
    pub private_sections: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance_band: [80, 120],
            truncation_floor: 10,
            private_sections: [
                "Assumptions",
                "Risks",
                "KPIs",
                "Draft Milestones",
                "Open Questions",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

impl ValidationConfig {
    /// Lower bound of the tolerance band, in percent.
    #[must_use]
    pub const fn min_percent(&self) -> u32 {
        self.tolerance_band[0]
    }

    /// Upper bound of the tolerance band, in percent.
    #[must_use]
    pub const fn max_percent(&self) -> u32 {
        self.tolerance_band[1]
    }

    fn validate(&self) -> ConfigResult<()> {
        let [min, max] = self.tolerance_band;
        if max == 0 {
            return Err(ConfigError::invalid(
                "tolerance band upper bound must be greater than zero",
            ));
        }
        if min > max {
            return Err(ConfigError::invalid(format!(
                "tolerance band lower bound {min}% exceeds upper bound {max}%"
            )));
        }
        if self.truncation_floor > 100 {
            return Err(ConfigError::invalid("truncation floor cannot exceed 100%"));
        }
        Ok(())
    }
}

/// Maps one constraint kind to the phrases that declare it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    /// Constraint kind being declared.
    pub constraint: ConstraintKind,
    /// Case-insensitive regular expressions matched against instruction text.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl VocabularyEntry {
    /// Creates an entry from a kind and its patterns.
    #[must_use]
    pub fn new<I, S>(constraint: ConstraintKind, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            constraint,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// A section title and the words that refer to it inside instructions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Canonical heading title.
    pub title: String,
    /// Alternative phrasings (matched as whole words, case-insensitive).
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl SectionSpec {
    /// Creates a section spec.
    #[must_use]
    pub fn new<I, S>(title: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }
}

/// Settings for the completion service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Model identifier.
    pub model: String,
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens the service may generate.
    pub max_output_tokens: Option<u32>,
    /// System message sent ahead of every instruction.
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            base_url: "https://api.openai.com/".to_owned(),
            timeout_secs: 60,
            temperature: 0.3,
            max_output_tokens: Some(400),
            system_prompt: "You are a helpful, concise assistant.".to_owned(),
        }
    }
}

impl CompletionConfig {
    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("completion model cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "completion timeout must be greater than zero",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "completion temperature must be within 0.0..=2.0",
            ));
        }
        Ok(())
    }
}

/// Backoff settings for retrying transient completion failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first call. One means no retries.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Cap on the exponential backoff delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    /// Delay before the first retry.
    #[must_use]
    pub const fn initial_delay(self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Upper bound on the backoff delay.
    #[must_use]
    pub const fn max_delay(self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("retry attempts must be at least one"));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::invalid(
                "initial retry delay cannot exceed max retry delay",
            ));
        }
        Ok(())
    }
}

fn default_vocabulary() -> Vec<VocabularyEntry> {
    vec![
        VocabularyEntry::new(
            ConstraintKind::NoTopLevelHeading,
            [
                r"\bno\s+(top-level\s+)?h1\b",
                r"\bavoid\s+a\s+top-level\b",
                r"\btop-level\s+(h1|heading|title)\b",
                r"\bwithout\s+an?\s+h1\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::MinHeadingLevel,
            [
                r"headings?\s+starting\s+from\s+'?(?P<hashes>#{2,6})",
                r"markdown\s+with\s+'?(?P<hashes>#{2,6})'?\s+and\s+lower",
                r"headings?\s+(starting\s+)?from\s+h(?P<level>[2-6])\b",
                r"\bh(?P<level>[2-6])\s+and\s+below\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::PreserveLength,
            [
                r"\bdo\s+not\s+shorten\b",
                r"\bdon't\s+shorten\b",
                r"\bpreserve\s+(the\s+)?(full\s+|original\s+)?length\b",
                r"\bpreserve\s+all\s+(content|details?)\b",
                r"\bkeep\s+(all|every)\s+(details?|content)\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::AllowSummarization,
            [
                r"\bcrisp\s+and\s+scannable\b",
                r"\bsummari[sz]e\b",
                r"\bbe\s+concise\b",
                r"\byou\s+may\s+(shorten|condense)\b",
                r"\bkeep\s+it\s+(short|brief|crisp)\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::NoFabrication,
            [
                r"\bdo\s+not\s+(invent|fabricate|make\s+up)\b",
                r"\bdon't\s+(invent|fabricate|make\s+up)\b",
                r"\bnever\s+(invent|fabricate)\b",
                r"\bonly\s+use\s+(the\s+)?(information|facts)\s+(from|in)\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::RequiredSections,
            [
                r"\binclude\b.*\b(assumptions|risks|kpis|milestones|open\s+questions)\b",
                r"\brequired\s+sections?\b",
            ],
        ),
        VocabularyEntry::new(
            ConstraintKind::TodoOnGap,
            [r"\btodos?\b", r"\btbd\b"],
        ),
    ]
}

fn default_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec::new("Assumptions", ["assumption", "assumptions"]),
        SectionSpec::new("Risks", ["risk", "risks"]),
        SectionSpec::new("KPIs", ["kpi", "kpis", "key performance indicators"]),
        SectionSpec::new("Draft Milestones", ["draft milestones", "milestones"]),
        SectionSpec::new("Open Questions", ["open questions"]),
    ]
}
