//! Last-registered-wins variant resolution with an audit trail.

use std::collections::BTreeSet;
use std::sync::Arc;

use notegen_primitives::{Category, ConstraintKind, FamilyKey};
use tracing::{debug, warn};

use crate::error::PromptResult;
use crate::store::{TemplateStore, Variant};

/// How the selected variant changed a constraint relative to its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideChange {
    /// An earlier variant declared the constraint; the selected one does not.
    Dropped {
        /// Most recent earlier variant that declared it.
        last_declared_by: usize,
    },
    /// The selected variant declares a constraint no earlier variant had.
    Introduced,
    /// Both declare the constraint, with different values (e.g. another
    /// heading level or section list).
    Changed {
        /// Most recent earlier variant that declared it.
        last_declared_by: usize,
    },
}

/// A constraint whose presence differs between the selected variant and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Override {
    /// Constraint kind affected.
    pub kind: ConstraintKind,
    /// Direction of the change.
    pub change: OverrideChange,
}

/// Outcome of resolving a family: the active variant plus everything it superseded.
#[derive(Debug, Clone)]
pub struct Resolution {
    family: FamilyKey,
    category: Category,
    history: Vec<Arc<Variant>>,
    overrides: Vec<Override>,
}

impl Resolution {
    /// Returns the family key.
    #[must_use]
    pub fn family(&self) -> &FamilyKey {
        &self.family
    }

    /// Returns the family category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the active variant.
    #[must_use]
    pub fn selected(&self) -> &Arc<Variant> {
        // Families are created by their first registration, so never empty.
        &self.history[self.history.len() - 1]
    }

    /// Returns the complete variant history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Arc<Variant>] {
        &self.history
    }

    /// Returns how the selected variant's constraints differ from its history.
    #[must_use]
    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// Returns `true` if the selected variant replaced earlier ones.
    #[must_use]
    pub fn is_override(&self) -> bool {
        self.history.len() > 1
    }
}

/// Selects the authoritative variant of a family.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    store: Arc<TemplateStore>,
}

impl VariantResolver {
    /// Creates a resolver reading from `store`.
    #[must_use]
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    /// Resolves `family` to its most recently registered variant.
    ///
    /// Contradictions with earlier variants are reported, never reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownFamily`](crate::PromptError::UnknownFamily)
    /// if the family was never registered.
    pub fn resolve(&self, family: &str) -> PromptResult<Resolution> {
        let snapshot = self.store.snapshot(family)?;
        let history = snapshot.variants;
        let selected = &history[history.len() - 1];
        let overrides = compute_overrides(&history);

        for earlier in &history[..history.len() - 1] {
            if let Some((old, new)) = length_contradiction(earlier, selected) {
                warn!(
                    family = %selected.family(),
                    selected = selected.index(),
                    superseded = earlier.index(),
                    superseded_constraint = %old,
                    selected_constraint = %new,
                    "selected variant contradicts an earlier variant; last registration wins"
                );
            }
        }

        debug!(
            family = %selected.family(),
            variant = selected.index(),
            history = history.len(),
            overrides = overrides.len(),
            "variant resolved"
        );

        Ok(Resolution {
            family: selected.family().clone(),
            category: snapshot.category,
            history,
            overrides,
        })
    }
}

fn compute_overrides(history: &[Arc<Variant>]) -> Vec<Override> {
    let Some((selected, earlier)) = history.split_last() else {
        return Vec::new();
    };
    if earlier.is_empty() {
        return Vec::new();
    }

    let current = selected.constraints().kinds();
    let mut seen_before = BTreeSet::new();
    let mut overrides = Vec::new();

    for kind in ConstraintKind::ALL {
        let Some(previous) = earlier
            .iter()
            .rev()
            .find(|variant| variant.constraints().has(kind))
        else {
            continue;
        };
        seen_before.insert(kind);
        let last_declared_by = previous.index();

        if !current.contains(&kind) {
            overrides.push(Override {
                kind,
                change: OverrideChange::Dropped { last_declared_by },
            });
        } else if !previous
            .constraints()
            .of_kind(kind)
            .eq(selected.constraints().of_kind(kind))
        {
            overrides.push(Override {
                kind,
                change: OverrideChange::Changed { last_declared_by },
            });
        }
    }

    overrides.extend(
        current
            .iter()
            .filter(|kind| !seen_before.contains(*kind))
            .map(|&kind| Override {
                kind,
                change: OverrideChange::Introduced,
            }),
    );
    overrides
}

fn length_contradiction(
    earlier: &Variant,
    selected: &Variant,
) -> Option<(ConstraintKind, ConstraintKind)> {
    let pairs = [
        (ConstraintKind::PreserveLength, ConstraintKind::AllowSummarization),
        (ConstraintKind::AllowSummarization, ConstraintKind::PreserveLength),
    ];
    pairs.into_iter().find(|(old, new)| {
        earlier.constraints().has(*old) && selected.constraints().has(*new)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptError;

    fn store_with(variants: &[&str]) -> Arc<TemplateStore> {
        let store = Arc::new(TemplateStore::default());
        let family = FamilyKey::new("public_markdown").unwrap();
        for text in variants {
            store.register(&family, Category::Public, *text).unwrap();
        }
        store
    }

    #[test]
    fn last_registered_variant_wins() {
        let store = store_with(&[
            "first {{source_notes}}",
            "second {{source_notes}}",
            "third {{source_notes}}",
        ]);
        let resolution = VariantResolver::new(store).resolve("public_markdown").unwrap();

        assert_eq!(resolution.selected().index(), 2);
        assert!(resolution.selected().text().starts_with("third"));
        assert_eq!(resolution.history().len(), 3);
        assert!(resolution.is_override());
        assert_eq!(resolution.category(), Category::Public);
    }

    #[test]
    fn single_variant_has_no_overrides() {
        let store = store_with(&["- Do not shorten.\n{{source_notes}}"]);
        let resolution = VariantResolver::new(store).resolve("public_markdown").unwrap();

        assert!(!resolution.is_override());
        assert!(resolution.overrides().is_empty());
    }

    #[test]
    fn overrides_record_dropped_and_introduced_constraints() {
        let store = store_with(&[
            "- Preserve all content, do not shorten.\n- Do not invent facts.\n{{source_notes}}",
            "- Be crisp and scannable, you may leave TODOs instead of detail.\n{{source_notes}}",
        ]);
        let resolution = VariantResolver::new(store).resolve("public_markdown").unwrap();
        let overrides = resolution.overrides();

        assert!(overrides.contains(&Override {
            kind: ConstraintKind::PreserveLength,
            change: OverrideChange::Dropped { last_declared_by: 0 },
        }));
        assert!(overrides.contains(&Override {
            kind: ConstraintKind::NoFabrication,
            change: OverrideChange::Dropped { last_declared_by: 0 },
        }));
        assert!(overrides.contains(&Override {
            kind: ConstraintKind::AllowSummarization,
            change: OverrideChange::Introduced,
        }));
        assert!(overrides.contains(&Override {
            kind: ConstraintKind::TodoOnGap,
            change: OverrideChange::Introduced,
        }));
    }

    #[test]
    fn changed_values_are_overrides() {
        let store = store_with(&[
            "- Use headings starting from '##'.\n- Required sections: Risks, KPIs.\n{{source_notes}}",
            "- Use headings starting from '###'.\n- Required sections: Risks, Open Questions.\n{{source_notes}}",
        ]);
        let resolution = VariantResolver::new(store).resolve("public_markdown").unwrap();
        let overrides = resolution.overrides();

        assert!(overrides.contains(&Override {
            kind: ConstraintKind::MinHeadingLevel,
            change: OverrideChange::Changed { last_declared_by: 0 },
        }));
        assert!(overrides.contains(&Override {
            kind: ConstraintKind::RequiredSections,
            change: OverrideChange::Changed { last_declared_by: 0 },
        }));
    }

    #[test]
    fn identical_redeclarations_are_not_overrides() {
        let store = store_with(&[
            "- Avoid a top-level H1.\n{{source_notes}}",
            "Revised wording.\n- Avoid a top-level H1.\n{{source_notes}}",
        ]);
        let resolution = VariantResolver::new(store).resolve("public_markdown").unwrap();

        assert!(resolution.is_override());
        assert!(resolution.overrides().is_empty());
    }

    #[test]
    fn unknown_family_fails() {
        let resolver = VariantResolver::new(Arc::new(TemplateStore::default()));
        let err = resolver.resolve("nope").expect_err("unknown");
        assert!(matches!(err, PromptError::UnknownFamily { .. }));
    }
}
