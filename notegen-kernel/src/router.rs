//! Routes validated renderings to the public or private surface.

use std::fmt;
use std::sync::Arc;

use notegen_config::NotegenConfig;
use notegen_policy::{ValidationOutcome, missing_sections};
use notegen_primitives::Category;
use notegen_prompts::Constraint;
use serde::Serialize;
use tracing::{debug, warn};

use crate::sink::{Delivery, MarkdownSink, Origin, Rejection, RejectionReporter, TracingSink};

/// Where a rendering ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Routing {
    /// Handed to the sink for `category`.
    Delivered {
        /// Surface that received the output.
        category: Category,
    },
    /// Reported to the rejection reporter instead.
    Rejected {
        /// Why the output was held back.
        reasons: Vec<String>,
    },
}

impl Routing {
    /// Returns `true` when the output reached a sink.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Sends passing output to the sink for its category; everything else goes
/// to the rejection reporter.
#[derive(Clone)]
pub struct SectionRouter {
    public: Arc<dyn MarkdownSink>,
    private: Arc<dyn MarkdownSink>,
    rejections: Arc<dyn RejectionReporter>,
    private_sections: Vec<String>,
}

impl fmt::Debug for SectionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionRouter")
            .field("private_sections", &self.private_sections)
            .finish_non_exhaustive()
    }
}

impl Default for SectionRouter {
    fn default() -> Self {
        let sink = Arc::new(TracingSink);
        Self::new(
            sink.clone(),
            sink.clone(),
            sink,
            NotegenConfig::default().validation.private_sections,
        )
    }
}

impl SectionRouter {
    /// Creates a router. `private_sections` are the headings every private
    /// rendering must contain.
    #[must_use]
    pub fn new(
        public: Arc<dyn MarkdownSink>,
        private: Arc<dyn MarkdownSink>,
        rejections: Arc<dyn RejectionReporter>,
        private_sections: Vec<String>,
    ) -> Self {
        Self {
            public,
            private,
            rejections,
            private_sections,
        }
    }

    /// Creates a router using the mandated private sections from `config`.
    #[must_use]
    pub fn from_config(
        config: &NotegenConfig,
        public: Arc<dyn MarkdownSink>,
        private: Arc<dyn MarkdownSink>,
        rejections: Arc<dyn RejectionReporter>,
    ) -> Self {
        Self::new(
            public,
            private,
            rejections,
            config.validation.private_sections.clone(),
        )
    }

    /// Returns the headings required for private delivery.
    #[must_use]
    pub fn private_sections(&self) -> &[String] {
        &self.private_sections
    }

    /// Routes `outcome` according to `origin.category`.
    pub fn route(&self, origin: &Origin, outcome: &ValidationOutcome) -> Routing {
        let mut reasons: Vec<String> = outcome.violations().map(|check| check.describe()).collect();

        if origin.category == Category::Private {
            let reported = reported_missing(outcome);
            reasons.extend(
                missing_sections(outcome.output(), &self.private_sections)
                    .into_iter()
                    .filter(|title| {
                        !reported
                            .iter()
                            .any(|seen| seen.eq_ignore_ascii_case(title))
                    })
                    .map(|title| format!("missing private section: {title}")),
            );
        }

        if !reasons.is_empty() {
            warn!(
                request_id = %origin.request_id,
                family = %origin.family,
                category = %origin.category,
                reasons = ?reasons,
                "rendering not routed"
            );
            self.rejections.report(Rejection {
                origin: origin.clone(),
                output: outcome.output().to_owned(),
                reasons: reasons.clone(),
            });
            return Routing::Rejected { reasons };
        }

        let delivery = Delivery {
            origin: origin.clone(),
            markdown: outcome.output().to_owned(),
            notes: outcome.warnings().map(|check| check.describe()).collect(),
        };
        debug!(
            request_id = %origin.request_id,
            family = %origin.family,
            category = %origin.category,
            notes = delivery.notes.len(),
            "rendering routed"
        );
        match origin.category {
            Category::Public => self.public.deliver(delivery),
            Category::Private => self.private.deliver(delivery),
        }
        Routing::Delivered {
            category: origin.category,
        }
    }
}

/// Titles a failed required-sections check has already named.
fn reported_missing(outcome: &ValidationOutcome) -> Vec<String> {
    outcome
        .violations()
        .filter_map(|check| match check.constraint() {
            Constraint::RequiredSections { sections } => Some(sections),
            _ => None,
        })
        .flat_map(|sections| missing_sections(outcome.output(), sections))
        .collect()
}

#[cfg(test)]
mod tests {
    use notegen_policy::{CheckStatus, ConstraintCheck};
    use std::collections::BTreeSet;

    use notegen_primitives::{FamilyKey, RequestId};

    use super::*;
    use crate::sink::CollectingSink;

    const FULL_PRIVATE: &str =
        "## Assumptions\n## Risks\n## KPIs\n## Draft Milestones\n## Open Questions\n";

    struct Harness {
        public: Arc<CollectingSink>,
        private: Arc<CollectingSink>,
        rejections: Arc<CollectingSink>,
        router: SectionRouter,
    }

    fn harness() -> Harness {
        let public = CollectingSink::new();
        let private = CollectingSink::new();
        let rejections = CollectingSink::new();
        let router = SectionRouter::from_config(
            &NotegenConfig::default(),
            public.clone(),
            private.clone(),
            rejections.clone(),
        );
        Harness {
            public,
            private,
            rejections,
            router,
        }
    }

    fn origin(category: Category) -> Origin {
        let family = match category {
            Category::Public => "public_markdown",
            Category::Private => "private_markdown",
        };
        Origin {
            request_id: RequestId::random(),
            family: FamilyKey::new(family).unwrap(),
            category,
        }
    }

    fn passing(output: &str) -> ValidationOutcome {
        ValidationOutcome::new(
            vec![ConstraintCheck::new(
                Constraint::TodoOnGap,
                CheckStatus::unchecked("informational"),
            )],
            output,
        )
    }

    #[test]
    fn public_pass_reaches_public_sink_only() {
        let h = harness();
        let routing = h.router.route(&origin(Category::Public), &passing("## Hi"));

        assert!(routing.is_delivered());
        let delivered = h.public.drain_deliveries();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].notes.len(), 1);
        assert!(h.private.drain_deliveries().is_empty());
        assert!(h.rejections.drain_rejections().is_empty());
    }

    #[test]
    fn failed_outcome_is_reported_not_routed() {
        let h = harness();
        let outcome = ValidationOutcome::new(
            vec![ConstraintCheck::new(
                Constraint::NoTopLevelHeading,
                CheckStatus::failed("level-1 heading at line 1"),
            )],
            "# Title",
        );
        let routing = h.router.route(&origin(Category::Public), &outcome);

        assert!(!routing.is_delivered());
        assert!(h.public.drain_deliveries().is_empty());
        let rejected = h.rejections.drain_rejections();
        assert_eq!(rejected[0].output, "# Title");
        assert_eq!(rejected[0].reasons.len(), 1);
    }

    #[test]
    fn private_output_needs_every_mandated_section() {
        let h = harness();
        let partial = "## Assumptions\n## Risks\n## KPIs\n## Draft Milestones\n";
        let routing = h.router.route(&origin(Category::Private), &passing(partial));

        assert_eq!(
            routing,
            Routing::Rejected {
                reasons: vec!["missing private section: Open Questions".into()]
            }
        );
        assert!(h.private.drain_deliveries().is_empty());
        assert_eq!(h.rejections.drain_rejections().len(), 1);
    }

    #[test]
    fn missing_section_is_reported_once() {
        let h = harness();
        let partial = "## Assumptions\n## Risks\n## KPIs\n## Draft Milestones\n";
        let sections: BTreeSet<String> = NotegenConfig::default()
            .validation
            .private_sections
            .into_iter()
            .collect();
        let outcome = ValidationOutcome::new(
            vec![ConstraintCheck::new(
                Constraint::RequiredSections { sections },
                CheckStatus::failed("missing sections: Open Questions"),
            )],
            partial,
        );

        let Routing::Rejected { reasons } = h.router.route(&origin(Category::Private), &outcome)
        else {
            panic!("private output without Open Questions must be rejected");
        };
        let mentions = reasons
            .iter()
            .filter(|reason| reason.contains("Open Questions"))
            .count();
        assert_eq!(mentions, 1);
    }

    #[test]
    fn complete_private_output_reaches_private_sink() {
        let h = harness();
        let routing = h.router.route(&origin(Category::Private), &passing(FULL_PRIVATE));

        assert_eq!(
            routing,
            Routing::Delivered {
                category: Category::Private
            }
        );
        assert_eq!(h.private.drain_deliveries().len(), 1);
        assert!(h.public.drain_deliveries().is_empty());
    }
}
