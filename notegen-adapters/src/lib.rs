//! Completion service adapters used by the rendering pipeline.
//!
//! The pipeline only ever talks to a [`CompletionDispatcher`]; the dispatcher
//! owns the timeout and forwards to a [`CompletionService`] implementation
//! such as [`openai::OpenAiService`].

#![warn(missing_docs, clippy::pedantic)]

pub mod dispatcher;
pub mod openai;
pub mod traits;

pub use dispatcher::CompletionDispatcher;
pub use traits::{
    CompletionError, CompletionRequest, CompletionResult, CompletionService, ServiceMetadata,
};
