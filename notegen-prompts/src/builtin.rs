//! Built-in template families shipped with notegen.
//!
//! Histories are registered oldest first, so the last entry of each family is
//! the active one.

use notegen_primitives::{Category, FamilyKey};

use crate::error::PromptResult;
use crate::store::TemplateStore;

/// Public idea page.
pub const PUBLIC_MARKDOWN: &str = "public_markdown";
/// Creator-only expansion.
pub const PRIVATE_MARKDOWN: &str = "private_markdown";
/// Short idea title.
pub const IDEA_TITLE: &str = "idea_title";
/// Follow-up questions for the creator.
pub const CLARIFYING_QUESTIONS: &str = "clarifying_questions";

const PUBLIC_HISTORY: &[&str] = &[
    "Turn these notes into a public-facing markdown page.

Rules:
- Preserve all content from the notes; do not shorten it.
- Do not invent facts, names, dates, or links that are not in the notes.
- Do NOT include a top-level H1 title (the app renders the title separately).
- Use section headings starting from '##' (H2) and below.

Source context:
{{source_notes}}",
    "Turn this into a clear, inspiring public-facing markdown page.

Rules:
- Do NOT include a top-level H1 title at the start (the app renders the title separately).
- Start with a short value-focused intro paragraph (no heading).
- Use section headings starting from '##' (H2) and below.
- Keep it crisp and scannable.

Source context:
{{source_notes}}",
    "Turn this into a clear, inspiring public-facing markdown page.

Rules:
- Do NOT include a top-level H1 title at the start (the app renders the title separately).
- Start with a short value-focused intro paragraph (no heading).
- Use section headings starting from '##' (H2) and below.
- Keep it crisp and scannable.
- You may leave TODOs instead of detail; do not invent facts absent from the source.

Source context:
{{source_notes}}",
];

const PRIVATE_HISTORY: &[&str] = &[
    "Turn this into exhaustive private notes for the creator.
- Include assumptions, risks, open questions, KPIs, draft milestones.
- Use markdown with '##' and lower. Avoid a top-level H1.

Source context:
{{source_notes}}",
    "Turn this into exhaustive private notes for the creator.
- Required sections: Assumptions, Risks, KPIs, Draft Milestones, Open Questions (each as a '##' heading).
- Use markdown with '##' and lower. Avoid a top-level H1.
- Where the notes are silent, write TODO instead of guessing.

Source context:
{{source_notes}}",
];

const TITLE_HISTORY: &[&str] = &["Craft a concise, compelling idea title (≤ 60 characters) from the context below.
Avoid trailing punctuation and do not wrap in quotes. Return ONLY the title text.

Context:
{{source_notes}}"];

const QUESTIONS_HISTORY: &[&str] = &["You are helping improve an idea page.

{{source_notes}}

Produce 3-5 short, specific clarifying questions that, if answered by the creator,
would materially improve the public page. Return ONLY a valid JSON list of strings.
Example:
[\"Who is the target audience?\", \"What is the key outcome?\", \"What timeline do you have?\"]"];

/// Registers every built-in family into `store`.
///
/// # Errors
///
/// Propagates registration errors, e.g. a category clash with a family the
/// store already holds.
pub fn register_defaults(store: &TemplateStore) -> PromptResult<()> {
    let families: [(&str, Category, &[&str]); 4] = [
        (PUBLIC_MARKDOWN, Category::Public, PUBLIC_HISTORY),
        (PRIVATE_MARKDOWN, Category::Private, PRIVATE_HISTORY),
        (IDEA_TITLE, Category::Public, TITLE_HISTORY),
        (CLARIFYING_QUESTIONS, Category::Private, QUESTIONS_HISTORY),
    ];

    for (key, category, history) in families {
        let key = FamilyKey::new(key)?;
        for text in history {
            store.register(&key, category, *text)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use notegen_primitives::ConstraintKind;

    use super::*;
    use crate::constraints::Constraint;
    use crate::resolver::VariantResolver;

    fn resolver() -> VariantResolver {
        let store = Arc::new(TemplateStore::default());
        register_defaults(&store).unwrap();
        VariantResolver::new(store)
    }

    #[test]
    fn registers_all_families() {
        let resolver = resolver();
        assert_eq!(resolver.store().len(), 4);
        assert_eq!(resolver.resolve(PUBLIC_MARKDOWN).unwrap().history().len(), 3);
    }

    #[test]
    fn active_public_variant_contract() {
        let resolution = resolver().resolve(PUBLIC_MARKDOWN).unwrap();
        let constraints = resolution.selected().constraints();

        let expected: BTreeSet<ConstraintKind> = [
            ConstraintKind::NoTopLevelHeading,
            ConstraintKind::MinHeadingLevel,
            ConstraintKind::AllowSummarization,
            ConstraintKind::NoFabrication,
            ConstraintKind::TodoOnGap,
        ]
        .into_iter()
        .collect();
        assert_eq!(constraints.kinds(), expected);
        assert_eq!(constraints.advisories().count(), 1);
    }

    #[test]
    fn first_public_variant_preserved_length() {
        let resolution = resolver().resolve(PUBLIC_MARKDOWN).unwrap();
        let first = &resolution.history()[0];
        assert!(first.constraints().has(ConstraintKind::PreserveLength));
        assert!(first.constraints().has(ConstraintKind::NoFabrication));
    }

    #[test]
    fn private_variants_require_five_sections() {
        let resolution = resolver().resolve(PRIVATE_MARKDOWN).unwrap();
        for variant in resolution.history() {
            let sections = variant.constraints().required_sections().unwrap();
            assert_eq!(sections.len(), 5, "variant {}", variant.index());
        }
        assert!(
            resolution
                .selected()
                .constraints()
                .iter()
                .any(|c| *c == Constraint::TodoOnGap)
        );
    }
}
