//! Completion service boundary: request type, error taxonomy, and the trait
//! every backend implements.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by completion services.
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Failures crossing the completion service boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// No response arrived within the allotted time.
    #[error("completion timed out after {after:?}")]
    Timeout {
        /// Deadline that expired.
        after: Duration,
    },

    /// The service could not be reached or is temporarily refusing work.
    #[error("completion service unavailable: {reason}")]
    ServiceUnavailable {
        /// Additional context for the failure.
        reason: String,
    },

    /// The service answered, but not with usable text.
    #[error("malformed completion response: {reason}")]
    MalformedResponse {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl CompletionError {
    /// Convenience constructor for unavailability.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed responses.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Returns `true` when repeating the identical request may succeed.
    ///
    /// Malformed responses are excluded: the same instruction is expected to
    /// produce the same failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ServiceUnavailable { .. })
    }
}

/// Minimal metadata describing a completion service instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceMetadata {
    provider: &'static str,
    model: String,
}

impl ServiceMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g., "openai").
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// One instruction sent to a completion service.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CompletionRequest {
    instruction: String,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl CompletionRequest {
    /// Creates a request for a bound instruction. `label` names the purpose
    /// of the call in logs (e.g. "Generate public markdown page").
    #[must_use]
    pub fn new(instruction: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            label: label.into(),
            system_prompt: None,
            max_output_tokens: None,
            temperature: None,
        }
    }

    /// Sets the system prompt that frames the instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the bound instruction.
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Returns the log label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the system prompt if configured.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// Text-in, text-out completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns basic metadata describing the service instance.
    fn metadata(&self) -> &ServiceMetadata;

    /// Sends the request and returns the raw completion text.
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<String>;
}
