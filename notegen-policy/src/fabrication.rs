//! Heuristic detection of content present in the output but not in the source.
//!
//! Nothing here is authoritative. Findings are surfaced for manual review.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s)\]>"'`]+"#).expect("url pattern"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:[.,:/-]\d+)*\b").expect("number pattern"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'’-]*").expect("word pattern"));
static LINE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s+|>\s*|[-*+•]\s+|\d+[.)]\s+)*").expect("marker pattern")
});

/// Words that are capitalised for reasons other than naming something.
const IGNORED_WORDS: &[&str] = &["i", "todo", "tbd", "n/a"];

/// Category of a suspicious token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A link the source never mentioned.
    Url,
    /// A capitalised word mid-sentence, likely a name, that the source lacks.
    ProperNoun,
    /// A number or date fragment absent from the source.
    Number,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Url => "url",
            Self::ProperNoun => "name",
            Self::Number => "number",
        })
    }
}

/// One token the output introduced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Finding {
    /// Token category.
    pub kind: FindingKind,
    /// The token as it appears in the output.
    pub token: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "possible fabrication ({}): {}", self.kind, self.token)
    }
}

/// Returns tokens in `output` that do not occur in `source`, deduplicated and sorted.
#[must_use]
pub fn scan(output: &str, source: &str) -> Vec<Finding> {
    let source_lower = source.to_lowercase();
    let source_words: HashSet<String> = WORD
        .find_iter(&source_lower)
        .map(|m| m.as_str().to_owned())
        .collect();

    let mut findings = BTreeSet::new();
    let mut in_fence = false;

    for line in output.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let mut rest = line.to_owned();
        for url in URL.find_iter(line) {
            let token = url.as_str().trim_end_matches(['.', ',', ';', ':']);
            if !source_lower.contains(&token.to_lowercase()) {
                findings.insert(Finding {
                    kind: FindingKind::Url,
                    token: token.to_owned(),
                });
            }
            rest = rest.replacen(token, " ", 1);
        }

        let body = LINE_MARKER.replace(&rest, "");
        for number in NUMBER.find_iter(&body) {
            let token = number.as_str().trim_end_matches(['.', ',', ':', '/', '-']);
            if !source.contains(token) {
                findings.insert(Finding {
                    kind: FindingKind::Number,
                    token: token.to_owned(),
                });
            }
        }

        if trimmed.starts_with('#') {
            continue;
        }
        for word in WORD.find_iter(&body) {
            let token = word.as_str();
            let lower = token.to_lowercase();
            if !starts_uppercase(token)
                || IGNORED_WORDS.contains(&lower.as_str())
                || source_words.contains(&lower)
                || at_sentence_start(&body[..word.start()])
            {
                continue;
            }
            findings.insert(Finding {
                kind: FindingKind::ProperNoun,
                token: token.to_owned(),
            });
        }
    }

    findings.into_iter().collect()
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn at_sentence_start(prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches(|ch: char| {
        ch.is_whitespace() || matches!(ch, '*' | '_' | '"' | '\'' | '(' | '[' | '“' | '‘' | '`')
    });
    prefix.is_empty() || prefix.ends_with(['.', '!', '?', ':', ';'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(output: &str, source: &str) -> Vec<String> {
        scan(output, source).into_iter().map(|f| f.token).collect()
    }

    #[test]
    fn invented_release_date_is_found() {
        let source = "Building a tool to auto-format creator notes into two outputs.";
        let output = "A tool that formats notes.\n\n## Timeline\n\nThe release ships in March 2025.";
        let found = scan(output, source);

        assert!(found.contains(&Finding {
            kind: FindingKind::Number,
            token: "2025".into()
        }));
        assert!(found.contains(&Finding {
            kind: FindingKind::ProperNoun,
            token: "March".into()
        }));
    }

    #[test]
    fn sentence_starts_and_list_items_are_not_names() {
        let source = "notes";
        let output = "Notes here. Another sentence!\n- Bullet point\n1. Numbered item\n> Quoted text";
        assert!(tokens(output, source).is_empty());
    }

    #[test]
    fn words_from_the_source_are_accepted_in_any_case() {
        let source = "we use rust and postgres";
        assert!(tokens("Built with Rust and Postgres.", source).is_empty());
    }

    #[test]
    fn unknown_urls_are_found_known_ones_are_not() {
        let source = "see https://example.com/docs";
        let output = "Docs at https://example.com/docs. Demo at https://demo.invalid/x.";
        assert_eq!(tokens(output, source), ["https://demo.invalid/x"]);
    }

    #[test]
    fn heading_words_are_not_names_but_heading_numbers_are_checked() {
        let source = "plan";
        assert_eq!(tokens("## Key Features for Q3 2030", source), ["2030"]);
    }

    #[test]
    fn fenced_code_is_skipped() {
        assert!(tokens("```\nlet Version = 42;\n```", "nothing").is_empty());
    }

    #[test]
    fn todo_markers_are_ignored() {
        assert!(tokens("Pricing is still open, see TODO.", "pricing is open").is_empty());
    }
}
