//! Binding of creator notes into a variant's placeholder.
//!
//! Variants use the `{{variable}}` syntax; the only variable the binder fills
//! is [`SOURCE_PLACEHOLDER`]. Other `{{...}}` sequences are left untouched.

use std::ops::Range;

use crate::error::{PromptError, PromptResult};
use crate::store::Variant;

/// Name of the variable receiving the source notes.
pub const SOURCE_PLACEHOLDER: &str = "source_notes";

/// Replaces the variant's placeholder with `source`, verbatim.
///
/// # Errors
///
/// Returns [`PromptError::EmptyContext`] if `source` is blank and
/// [`PromptError::MalformedVariant`] if the placeholder is missing or repeated.
///
/// # Examples
///
/// ```
/// use notegen_prompts::bind_text;
///
/// let bound = bind_text("Summarise:\n{{source_notes}}", "# raw *notes*").unwrap();
/// assert_eq!(bound, "Summarise:\n# raw *notes*");
/// ```
pub fn bind(variant: &Variant, source: &str) -> PromptResult<String> {
    bind_text(variant.text(), source)
}

/// Binds `source` into raw template text. See [`bind`].
///
/// # Errors
///
/// Same as [`bind`].
pub fn bind_text(template: &str, source: &str) -> PromptResult<String> {
    if source.trim().is_empty() {
        return Err(PromptError::EmptyContext);
    }

    let span = single_placeholder(template)?;
    let mut bound = String::with_capacity(template.len() - span.len() + source.len());
    bound.push_str(&template[..span.start]);
    bound.push_str(source);
    bound.push_str(&template[span.end..]);
    Ok(bound)
}

/// Checks that `template` contains the placeholder exactly once.
///
/// # Errors
///
/// Returns [`PromptError::MalformedVariant`] otherwise.
pub fn ensure_single_placeholder(template: &str) -> PromptResult<()> {
    single_placeholder(template).map(|_| ())
}

fn single_placeholder(template: &str) -> PromptResult<Range<usize>> {
    let mut spans = variable_refs(template)
        .into_iter()
        .filter(|var| var.name == SOURCE_PLACEHOLDER)
        .map(|var| var.span);

    match (spans.next(), spans.next()) {
        (Some(span), None) => Ok(span),
        (None, _) => Err(PromptError::malformed(format!(
            "placeholder {{{{{SOURCE_PLACEHOLDER}}}}} is missing"
        ))),
        (Some(_), Some(_)) => Err(PromptError::malformed(format!(
            "placeholder {{{{{SOURCE_PLACEHOLDER}}}}} appears {} times",
            2 + spans.count()
        ))),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct VariableRef<'a> {
    name: &'a str,
    span: Range<usize>,
}

/// Extracts `{{name}}` references with the byte span of each, braces included.
fn variable_refs(template: &str) -> Vec<VariableRef<'_>> {
    let mut refs = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find("{{") {
        let start = cursor + offset;
        let inner_start = start + 2;
        let Some(inner_len) = template[inner_start..].find("}}") else {
            break;
        };
        let inner = &template[inner_start..inner_start + inner_len];

        // `{{ stray {{name}}`: restart the scan at the inner opening braces.
        if let Some(nested) = inner.rfind("{{") {
            cursor = inner_start + nested;
            continue;
        }

        let end = inner_start + inner_len + 2;
        let name = inner.trim();
        if !name.is_empty() {
            refs.push(VariableRef {
                name,
                span: start..end,
            });
        }
        cursor = end;
    }

    refs
}
