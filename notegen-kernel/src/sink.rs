//! Downstream consumers of routed renderings.

use std::sync::{Arc, Mutex};

use notegen_primitives::{Category, FamilyKey, RequestId};
use serde::Serialize;
use tracing::{info, warn};

/// Identifies the rendering a routed payload came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Correlation id of the rendering request.
    pub request_id: RequestId,
    /// Family the output was rendered from.
    pub family: FamilyKey,
    /// Category of that family.
    pub category: Category,
}

/// Validated markdown handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Where the markdown came from.
    pub origin: Origin,
    /// The completion text, unmodified.
    pub markdown: String,
    /// Flagged and unchecked notes that travel with the output.
    pub notes: Vec<String>,
}

/// Output that was not routed, with the reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Where the output came from.
    pub origin: Origin,
    /// The raw completion text.
    pub output: String,
    /// Why routing was refused.
    pub reasons: Vec<String>,
}

/// Receives validated markdown for one surface.
pub trait MarkdownSink: Send + Sync {
    /// Accepts a delivery.
    fn deliver(&self, delivery: Delivery);
}

/// Receives output that failed validation or routing.
pub trait RejectionReporter: Send + Sync {
    /// Records a rejection.
    fn report(&self, rejection: Rejection);
}

/// Sink and reporter that only log.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MarkdownSink for TracingSink {
    fn deliver(&self, delivery: Delivery) {
        info!(
            request_id = %delivery.origin.request_id,
            family = %delivery.origin.family,
            category = %delivery.origin.category,
            chars = delivery.markdown.chars().count(),
            notes = ?delivery.notes,
            "markdown delivered"
        );
    }
}

impl RejectionReporter for TracingSink {
    fn report(&self, rejection: Rejection) {
        warn!(
            request_id = %rejection.origin.request_id,
            family = %rejection.origin.family,
            category = %rejection.origin.category,
            reasons = ?rejection.reasons,
            "rendering rejected"
        );
    }
}

/// Sink and reporter that keep everything in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    deliveries: Mutex<Vec<Delivery>>,
    rejections: Mutex<Vec<Rejection>>,
}

impl CollectingSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns the collected deliveries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain_deliveries(&self) -> Vec<Delivery> {
        let mut lock = self.deliveries.lock().expect("collecting sink poisoned");
        lock.drain(..).collect()
    }

    /// Removes and returns the collected rejections.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain_rejections(&self) -> Vec<Rejection> {
        let mut lock = self.rejections.lock().expect("collecting sink poisoned");
        lock.drain(..).collect()
    }
}

impl MarkdownSink for CollectingSink {
    fn deliver(&self, delivery: Delivery) {
        self.deliveries
            .lock()
            .expect("collecting sink poisoned")
            .push(delivery);
    }
}

impl RejectionReporter for CollectingSink {
    fn report(&self, rejection: Rejection) {
        self.rejections
            .lock()
            .expect("collecting sink poisoned")
            .push(rejection);
    }
}
