//! Single-shot dispatch of bound instructions to a completion service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use notegen_config::CompletionConfig;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::traits::{CompletionError, CompletionRequest, CompletionResult, CompletionService};

/// Sends bound instructions to a [`CompletionService`] under a deadline.
///
/// The dispatcher never retries; retry policy belongs to the caller.
#[derive(Clone)]
pub struct CompletionDispatcher {
    service: Arc<dyn CompletionService>,
    timeout: Duration,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl fmt::Debug for CompletionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.service.metadata();
        f.debug_struct("CompletionDispatcher")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionDispatcher {
    /// Creates a dispatcher with the given per-call deadline.
    #[must_use]
    pub fn new(service: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            system_prompt: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Creates a dispatcher using the timeout and request defaults of `config`.
    #[must_use]
    pub fn from_config(service: Arc<dyn CompletionService>, config: &CompletionConfig) -> Self {
        let mut dispatcher = Self::new(service, config.timeout())
            .with_system_prompt(config.system_prompt.clone())
            .with_temperature(config.temperature);
        dispatcher.max_output_tokens = config.max_output_tokens;
        dispatcher
    }

    /// Sets the system prompt attached to every request.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Sets the sampling temperature attached to every request.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the output token budget attached to every request.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Returns the per-call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `instruction` and returns the raw completion text.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Timeout`] when the deadline expires,
    /// [`CompletionError::MalformedResponse`] for blank output, and any error
    /// reported by the service.
    pub async fn dispatch(&self, instruction: &str, label: &str) -> CompletionResult<String> {
        let request = self.build_request(instruction, label);
        let metadata = self.service.metadata();
        debug!(
            provider = metadata.provider(),
            model = metadata.model(),
            label,
            instruction_chars = instruction.chars().count(),
            "dispatching completion"
        );

        let output = match timeout(self.timeout, self.service.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                after: self.timeout,
            }),
        }
        .inspect_err(|err| warn!(label, error = %err, "completion failed"))?;

        if output.trim().is_empty() {
            warn!(label, "completion returned blank output");
            return Err(CompletionError::malformed("completion returned no text"));
        }

        debug!(label, output_chars = output.chars().count(), "completion received");
        Ok(output)
    }

    fn build_request(&self, instruction: &str, label: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(instruction, label);
        if let Some(prompt) = &self.system_prompt {
            request = request.with_system_prompt(prompt.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(tokens) = self.max_output_tokens {
            request = request.with_max_output_tokens(tokens);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::traits::ServiceMetadata;

    struct ScriptedService {
        metadata: ServiceMetadata,
        delay: Duration,
        reply: CompletionResult<String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedService {
        fn new(reply: CompletionResult<String>) -> Self {
            Self {
                metadata: ServiceMetadata::new("scripted", "test-model"),
                delay: Duration::ZERO,
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        fn metadata(&self) -> &ServiceMetadata {
            &self.metadata
        }

        async fn complete(&self, request: CompletionRequest) -> CompletionResult<String> {
            self.seen.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn returns_service_output() {
        let service = Arc::new(ScriptedService::new(Ok("## Hello".into())));
        let dispatcher = CompletionDispatcher::new(service.clone(), Duration::from_secs(1))
            .with_system_prompt("be brief")
            .with_max_output_tokens(64);

        let output = dispatcher.dispatch("instruction", "test").await.unwrap();
        assert_eq!(output, "## Hello");

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen[0].system_prompt(), Some("be brief"));
        assert_eq!(seen[0].max_output_tokens(), Some(64));
        assert_eq!(seen[0].label(), "test");
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_maps_to_timeout() {
        let mut service = ScriptedService::new(Ok("late".into()));
        service.delay = Duration::from_secs(30);
        let dispatcher = CompletionDispatcher::new(Arc::new(service), Duration::from_secs(2));

        let err = dispatcher.dispatch("instruction", "test").await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Timeout {
                after: Duration::from_secs(2)
            }
        );
    }

    #[tokio::test]
    async fn blank_output_is_malformed() {
        let service = Arc::new(ScriptedService::new(Ok("  \n".into())));
        let dispatcher = CompletionDispatcher::new(service, Duration::from_secs(1));

        let err = dispatcher.dispatch("instruction", "test").await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn service_errors_propagate() {
        let service = Arc::new(ScriptedService::new(Err(CompletionError::unavailable("503"))));
        let dispatcher = CompletionDispatcher::new(service, Duration::from_secs(1));

        let err = dispatcher.dispatch("instruction", "test").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn config_defaults_flow_into_requests() {
        let service = Arc::new(ScriptedService::new(Ok(String::new())));
        let dispatcher = CompletionDispatcher::from_config(service, &CompletionConfig::default());
        let request = dispatcher.build_request("x", "label");

        assert_eq!(dispatcher.timeout(), Duration::from_secs(60));
        assert_eq!(request.temperature(), Some(0.3));
        assert_eq!(request.max_output_tokens(), Some(400));
        assert_eq!(
            request.system_prompt(),
            Some("You are a helpful, concise assistant.")
        );
    }
}
