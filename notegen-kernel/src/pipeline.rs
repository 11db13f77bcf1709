//! Resolve, bind, dispatch, validate, route.

use std::sync::Arc;

use futures::future::join_all;
use notegen_adapters::{CompletionDispatcher, CompletionError, CompletionService};
use notegen_config::NotegenConfig;
use notegen_policy::{OutputValidator, ValidationOutcome};
use notegen_primitives::{Category, FamilyKey, RequestId};
use notegen_prompts::builtin::{PRIVATE_MARKDOWN, PUBLIC_MARKDOWN};
use notegen_prompts::{
    ConstraintSet, PromptError, Resolution, SourceNotes, TemplateStore, VariantResolver, bind,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::router::{Routing, SectionRouter};
use crate::sink::Origin;

const PUBLIC_LABEL: &str = "Generate public markdown page";
const PRIVATE_LABEL: &str = "Generate private markdown page";

/// Errors that stop a rendering before validation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Resolution or binding failed; nothing was dispatched.
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// The completion service failed.
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A family key plus the creator notes to bind into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    request_id: RequestId,
    family: String,
    source: String,
    label: Option<String>,
}

impl RenderRequest {
    /// Creates a request with a fresh correlation id.
    #[must_use]
    pub fn new(family: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::random(),
            family: family.into(),
            source: source.into(),
            label: None,
        }
    }

    /// Overrides the correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Sets the label used when logging the completion call.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the requested family key.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Returns the unbound source notes.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the completion label.
    #[must_use]
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("Render {}", self.family))
    }
}

/// A bound instruction ready for dispatch.
#[derive(Debug, Clone)]
pub struct RenderResult {
    request_id: RequestId,
    instruction: String,
    constraints: ConstraintSet,
    resolution: Resolution,
}

impl RenderResult {
    /// Returns the correlation id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the bound instruction.
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Returns the constraints inherited from the selected variant.
    #[must_use]
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Returns the family category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.resolution.category()
    }

    /// Returns the family key.
    #[must_use]
    pub fn family(&self) -> &FamilyKey {
        self.resolution.family()
    }

    /// Returns the resolution, history included.
    #[must_use]
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    fn origin(&self) -> Origin {
        Origin {
            request_id: self.request_id,
            family: self.family().clone(),
            category: self.category(),
        }
    }
}

/// A completed rendering: what was sent, what came back, and where it went.
#[derive(Debug, Clone)]
pub struct Rendering {
    result: RenderResult,
    outcome: ValidationOutcome,
    routing: Routing,
}

impl Rendering {
    /// Returns the prepared request.
    #[must_use]
    pub fn result(&self) -> &RenderResult {
        &self.result
    }

    /// Returns the validation outcome, raw output included.
    #[must_use]
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// Returns the routing decision.
    #[must_use]
    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    /// Returns the raw completion text.
    #[must_use]
    pub fn output(&self) -> &str {
        self.outcome.output()
    }
}

/// Public and private renderings of one creator submission.
#[derive(Debug)]
pub struct SubmissionRendering {
    /// Source text composed from the submission.
    pub context: String,
    /// Public rendering.
    pub public: PipelineResult<Rendering>,
    /// Private rendering.
    pub private: PipelineResult<Rendering>,
}

/// Orchestrates a rendering from family key to routed output.
#[derive(Debug, Clone)]
pub struct Pipeline {
    resolver: VariantResolver,
    dispatcher: CompletionDispatcher,
    validator: OutputValidator,
    router: SectionRouter,
    retry: RetryPolicy,
}

impl Pipeline {
    /// Creates a pipeline that makes a single attempt per rendering.
    #[must_use]
    pub fn new(
        resolver: VariantResolver,
        dispatcher: CompletionDispatcher,
        validator: OutputValidator,
        router: SectionRouter,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            validator,
            router,
            retry: RetryPolicy::single_attempt(),
        }
    }

    /// Wires a pipeline from configuration.
    #[must_use]
    pub fn from_config(
        config: &NotegenConfig,
        store: Arc<TemplateStore>,
        service: Arc<dyn CompletionService>,
        router: SectionRouter,
    ) -> Self {
        Self::new(
            VariantResolver::new(store),
            CompletionDispatcher::from_config(service, &config.completion),
            OutputValidator::from_config(config),
            router,
        )
        .with_retry(RetryPolicy::from_config(config.retry))
    }

    /// Sets the retry policy used by the retrying entry points.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the resolver.
    #[must_use]
    pub fn resolver(&self) -> &VariantResolver {
        &self.resolver
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &CompletionDispatcher {
        &self.dispatcher
    }

    /// Resolves and binds `request` without dispatching.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Prompt`] for an unknown family, blank source
    /// notes, or a malformed variant.
    pub fn prepare(&self, request: &RenderRequest) -> PipelineResult<RenderResult> {
        let resolution = self.resolver.resolve(request.family())?;
        let selected = resolution.selected();
        let instruction = bind(selected, request.source())?;

        debug!(
            request_id = %request.request_id(),
            family = %resolution.family(),
            variant = selected.index(),
            constraints = selected.constraints().len(),
            "rendering prepared"
        );

        Ok(RenderResult {
            request_id: request.request_id(),
            constraints: selected.constraints().clone(),
            instruction,
            resolution,
        })
    }

    /// Renders once: no retries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Prompt`] before dispatch and
    /// [`PipelineError::Completion`] if the service call fails. Validation
    /// failures are not errors; they are reported in the [`Rendering`].
    pub async fn render(&self, request: RenderRequest) -> PipelineResult<Rendering> {
        let result = self.prepare(&request)?;
        let output = self
            .dispatcher
            .dispatch(result.instruction(), &request.label())
            .await?;
        Ok(self.finish(&request, result, output))
    }

    /// Renders, retrying transient completion failures per the retry policy.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::render`], after the retry policy gives up.
    pub async fn render_with_retry(&self, request: RenderRequest) -> PipelineResult<Rendering> {
        let result = self.prepare(&request)?;
        let label = request.label();
        let dispatcher = &self.dispatcher;
        let instruction = result.instruction();
        let output = self
            .retry
            .run(&label, |_| dispatcher.dispatch(instruction, &label))
            .await?;
        Ok(self.finish(&request, result, output))
    }

    /// Renders the public and private families from the same source text
    /// concurrently. Each side fails or succeeds on its own.
    pub async fn render_pair(
        &self,
        source: &str,
    ) -> (PipelineResult<Rendering>, PipelineResult<Rendering>) {
        let public = RenderRequest::new(PUBLIC_MARKDOWN, source).with_label(PUBLIC_LABEL);
        let private = RenderRequest::new(PRIVATE_MARKDOWN, source).with_label(PRIVATE_LABEL);
        tokio::join!(
            self.render_with_retry(public),
            self.render_with_retry(private)
        )
    }

    /// Composes `notes` into source text and renders both surfaces.
    ///
    /// A blank submission fails both sides with [`PromptError::EmptyContext`]
    /// without calling the service; the composed labels alone are not notes.
    pub async fn render_submission(&self, notes: &SourceNotes) -> SubmissionRendering {
        let context = notes.to_context();
        if notes.is_blank() {
            warn!("blank submission; nothing dispatched");
            return SubmissionRendering {
                context,
                public: Err(PromptError::EmptyContext.into()),
                private: Err(PromptError::EmptyContext.into()),
            };
        }
        let (public, private) = self.render_pair(&context).await;
        SubmissionRendering {
            context,
            public,
            private,
        }
    }

    /// Renders every request concurrently, preserving order in the results.
    pub async fn render_all(&self, requests: Vec<RenderRequest>) -> Vec<PipelineResult<Rendering>> {
        join_all(
            requests
                .into_iter()
                .map(|request| self.render_with_retry(request)),
        )
        .await
    }

    fn finish(&self, request: &RenderRequest, result: RenderResult, output: String) -> Rendering {
        let outcome = self
            .validator
            .validate(&output, result.constraints(), Some(request.source()));
        let routing = self.router.route(&result.origin(), &outcome);

        info!(
            request_id = %result.request_id(),
            family = %result.family(),
            passed = outcome.is_pass(),
            delivered = routing.is_delivered(),
            "rendering complete"
        );

        Rendering {
            result,
            outcome,
            routing,
        }
    }
}
