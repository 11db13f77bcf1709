//! Rendering pipeline for notegen.
//!
//! A [`Pipeline`] resolves a template family, binds the creator's notes,
//! dispatches the instruction, validates the completion against the
//! variant's constraints, and routes the result through a [`SectionRouter`]
//! to the public or private sink. [`Assistant`] covers the auxiliary title
//! and clarifying-question generations.

#![warn(missing_docs, clippy::pedantic)]

pub mod assist;
pub mod pipeline;
pub mod retry;
pub mod router;
pub mod sink;

pub use assist::Assistant;
pub use pipeline::{
    Pipeline, PipelineError, PipelineResult, RenderRequest, RenderResult, Rendering,
    SubmissionRendering,
};
pub use retry::RetryPolicy;
pub use router::{Routing, SectionRouter};
pub use sink::{
    CollectingSink, Delivery, MarkdownSink, Origin, Rejection, RejectionReporter, TracingSink,
};
