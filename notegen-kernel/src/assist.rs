//! Auxiliary generations: idea titles and clarifying questions.
//!
//! Both are best effort. Failures are logged and a fallback is returned.

use notegen_adapters::CompletionDispatcher;
use notegen_prompts::builtin::{CLARIFYING_QUESTIONS, IDEA_TITLE};
use notegen_prompts::{SourceNotes, VariantResolver, bind};
use serde_json::Value;
use tracing::{debug, warn};

use crate::pipeline::{PipelineError, PipelineResult};

/// Longest title returned by [`Assistant::suggest_title`], in characters.
pub const MAX_TITLE_CHARS: usize = 60;
/// Most questions returned by [`Assistant::clarifying_questions`].
pub const MAX_QUESTIONS: usize = 5;

/// Generates titles and follow-up questions from the built-in families.
#[derive(Debug, Clone)]
pub struct Assistant {
    resolver: VariantResolver,
    dispatcher: CompletionDispatcher,
}

impl Assistant {
    /// Creates an assistant.
    #[must_use]
    pub fn new(resolver: VariantResolver, dispatcher: CompletionDispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Suggests a short title for `notes`, falling back to the title the
    /// creator supplied. Blank notes are never sent to the service.
    pub async fn suggest_title(&self, notes: &SourceNotes) -> String {
        if notes.is_blank() {
            debug!("blank submission; keeping the supplied title");
            return notes.title.trim().to_owned();
        }
        let context = format!(
            "TITLE (user-supplied): {}\nSUMMARY: {}\nNOTES: {}\nLINKS: {}",
            notes.title,
            notes.summary.as_deref().unwrap_or_default(),
            notes.notes.as_deref().unwrap_or_default(),
            notes.links.join(", ")
        );

        match self.generate(IDEA_TITLE, &context, "Generate idea title").await {
            Ok(raw) => {
                let title = sanitise_title(&raw);
                if title.is_empty() {
                    notes.title.trim().to_owned()
                } else {
                    debug!(title = %title, "title suggested");
                    title
                }
            }
            Err(err) => {
                warn!(error = %err, "title generation failed; keeping the supplied title");
                notes.title.trim().to_owned()
            }
        }
    }

    /// Asks for up to five questions whose answers would improve the page.
    /// Returns an empty list on failure.
    pub async fn clarifying_questions(
        &self,
        title: &str,
        public_md: &str,
        private_md: &str,
    ) -> Vec<String> {
        let context = format!(
            "TITLE: {title}\n\nPUBLIC MARKDOWN:\n{public_md}\n\nPRIVATE MARKDOWN:\n{private_md}"
        );

        match self
            .generate(CLARIFYING_QUESTIONS, &context, "Generate clarifying questions")
            .await
        {
            Ok(raw) => {
                let questions = parse_questions(&raw);
                debug!(count = questions.len(), "clarifying questions generated");
                questions
            }
            Err(err) => {
                warn!(error = %err, "clarifying question generation failed");
                Vec::new()
            }
        }
    }

    async fn generate(&self, family: &str, context: &str, label: &str) -> PipelineResult<String> {
        let resolution = self.resolver.resolve(family)?;
        let instruction = bind(resolution.selected(), context)?;
        self.dispatcher
            .dispatch(&instruction, label)
            .await
            .map_err(PipelineError::from)
    }
}

/// Collapses newlines, strips wrapping quotes, and caps the length.
#[must_use]
pub fn sanitise_title(raw: &str) -> String {
    let single_line = raw.replace(['\r', '\n'], " ");
    let unquoted = single_line
        .trim()
        .trim_matches(|ch| matches!(ch, '"' | '\'' | '“' | '”'))
        .trim();
    unquoted
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_owned()
}

/// Parses a JSON list of questions, falling back to one question per line.
#[must_use]
pub fn parse_questions(raw: &str) -> Vec<String> {
    let parsed: Vec<String> = match serde_json::from_str::<Vec<Value>>(strip_code_fence(raw)) {
        Ok(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => raw
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '•', '*']).trim().to_owned())
            .collect(),
    };

    parsed
        .into_iter()
        .map(|question| question.trim().to_owned())
        .filter(|question| !question.is_empty())
        .take(MAX_QUESTIONS)
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Skip a language tag such as `json` on the opening fence.
    body.split_once('\n').map_or(body, |(_, rest)| rest).trim()
}
