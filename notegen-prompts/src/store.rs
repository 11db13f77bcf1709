//! Append-only store of template families and their variant histories.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use notegen_primitives::{Category, FamilyKey};
use serde::Serialize;
use tracing::{debug, info};

use crate::binder::ensure_single_placeholder;
use crate::constraints::{ConstraintExtractor, ConstraintSet};
use crate::error::{PromptError, PromptResult};

/// One recorded version of a family's instruction text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    family: FamilyKey,
    index: usize,
    text: String,
    constraints: ConstraintSet,
}

impl Variant {
    /// Returns the owning family key.
    #[must_use]
    pub fn family(&self) -> &FamilyKey {
        &self.family
    }

    /// Returns the position of this variant in its family history (0 = oldest).
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the raw instruction text, placeholder included.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the constraints declared by the instruction text.
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

#[derive(Debug)]
struct TemplateFamily {
    category: Category,
    variants: Vec<Arc<Variant>>,
}

/// Consistent view of a family taken under a single read lock.
#[derive(Debug, Clone)]
pub struct FamilySnapshot {
    /// Category fixed at family creation.
    pub category: Category,
    /// Variants, oldest first.
    pub variants: Vec<Arc<Variant>>,
}

/// Thread-safe registry of template families.
///
/// Variant histories only ever grow. Registrations are serialised by a write
/// lock, so the order in which they complete is the order the resolver sees.
#[derive(Debug)]
pub struct TemplateStore {
    extractor: ConstraintExtractor,
    families: RwLock<BTreeMap<FamilyKey, TemplateFamily>>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(ConstraintExtractor::default())
    }
}

impl TemplateStore {
    /// Creates an empty store that parses constraints with `extractor`.
    #[must_use]
    pub fn new(extractor: ConstraintExtractor) -> Self {
        Self {
            extractor,
            families: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the extractor used for newly registered variants.
    #[must_use]
    pub fn extractor(&self) -> &ConstraintExtractor {
        &self.extractor
    }

    /// Appends a variant to `family`, creating the family on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MalformedVariant`] if the text does not contain
    /// the placeholder exactly once, and [`PromptError::CategoryMismatch`] if
    /// the family already exists with another category.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn register(
        &self,
        family: &FamilyKey,
        category: Category,
        text: impl Into<String>,
    ) -> PromptResult<Arc<Variant>> {
        let text = text.into();
        ensure_single_placeholder(&text)?;
        let constraints = self.extractor.extract(&text);

        let mut guard = self.families.write().expect("template store poisoned");
        let entry = guard
            .entry(family.clone())
            .or_insert_with(|| TemplateFamily {
                category,
                variants: Vec::new(),
            });

        if entry.category != category {
            return Err(PromptError::CategoryMismatch {
                family: family.to_string(),
                existing: entry.category,
                requested: category,
            });
        }

        let variant = Arc::new(Variant {
            family: family.clone(),
            index: entry.variants.len(),
            text,
            constraints,
        });
        entry.variants.push(Arc::clone(&variant));

        if variant.index == 0 {
            info!(family = %family, %category, "template family created");
        }
        debug!(
            family = %family,
            variant = variant.index,
            constraints = variant.constraints.len(),
            "variant registered"
        );
        Ok(variant)
    }

    /// Returns the variants of `family`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownFamily`] if nothing was registered under the key.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn variants_of(&self, family: &str) -> PromptResult<Vec<Arc<Variant>>> {
        self.snapshot(family).map(|snapshot| snapshot.variants)
    }

    /// Returns the category fixed for `family`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownFamily`] if nothing was registered under the key.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn category_of(&self, family: &str) -> PromptResult<Category> {
        let guard = self.families.read().expect("template store poisoned");
        guard
            .get(family)
            .map(|entry| entry.category)
            .ok_or_else(|| PromptError::unknown_family(family))
    }

    /// Returns the category and variants of `family` under one read lock.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownFamily`] if nothing was registered under the key.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn snapshot(&self, family: &str) -> PromptResult<FamilySnapshot> {
        let guard = self.families.read().expect("template store poisoned");
        guard
            .get(family)
            .map(|entry| FamilySnapshot {
                category: entry.category,
                variants: entry.variants.clone(),
            })
            .ok_or_else(|| PromptError::unknown_family(family))
    }

    /// Returns the registered family keys in sorted order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn families(&self) -> Vec<FamilyKey> {
        let guard = self.families.read().expect("template store poisoned");
        guard.keys().cloned().collect()
    }

    /// Returns the number of families.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.families.read().expect("template store poisoned").len()
    }

    /// Returns `true` if no family has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
