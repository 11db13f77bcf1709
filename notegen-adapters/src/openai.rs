//! `OpenAI` chat-completions backend.

use std::sync::Arc;
use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use notegen_config::CompletionConfig;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::traits::{
    CompletionError, CompletionRequest, CompletionResult, CompletionService, ServiceMetadata,
};

/// Environment variable holding the API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the model.
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Problems constructing an [`OpenAiService`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenAiSetupError {
    /// No API key was supplied or found in the environment.
    #[error("OpenAI service requires an API key (set {OPENAI_API_KEY_ENV})")]
    MissingApiKey,

    /// The base URL could not be used to build an endpoint.
    #[error("invalid OpenAI base URL: {reason}")]
    InvalidBaseUrl {
        /// Why the URL was rejected.
        reason: String,
    },
}

/// Connection settings for [`OpenAiService`].
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a configuration for `model` against the public API.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: "https://api.openai.com/".to_owned(),
            default_temperature: None,
        }
    }

    /// Reads the API key and model from the environment, defaulting the model
    /// to `gpt-4o-mini`.
    #[must_use]
    pub fn from_env() -> Self {
        let model = env::var(OPENAI_MODEL_ENV)
            .ok()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        let mut cfg = Self::new(model);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        cfg
    }

    /// Builds a configuration from the `[completion]` table, taking the API
    /// key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`OpenAiSetupError::InvalidBaseUrl`] if the configured base URL
    /// is unusable.
    pub fn from_completion_config(config: &CompletionConfig) -> Result<Self, OpenAiSetupError> {
        let mut cfg = Self::new(config.model.clone())
            .with_base_url(&config.base_url)?
            .with_default_temperature(config.temperature);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok();
        Ok(cfg)
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`OpenAiSetupError::InvalidBaseUrl`] if the URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, OpenAiSetupError> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the temperature used when requests omit one.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Completion service backed by the `OpenAI` chat-completions endpoint.
pub struct OpenAiService {
    client: HttpsClient,
    endpoint: Uri,
    metadata: ServiceMetadata,
    api_key: String,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiService")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiService {
    /// Constructs the service.
    ///
    /// # Errors
    ///
    /// Returns [`OpenAiSetupError::MissingApiKey`] if no key is configured and
    /// [`OpenAiSetupError::InvalidBaseUrl`] if the endpoint cannot be formed.
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiSetupError> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(OpenAiSetupError::MissingApiKey)?;

        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| OpenAiSetupError::InvalidBaseUrl {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client: https_client(),
            endpoint,
            metadata: ServiceMetadata::new("openai", config.model),
            api_key,
            default_temperature: config.default_temperature,
        })
    }

    fn build_payload(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt() {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_owned(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.instruction().to_owned(),
        });

        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages,
            temperature: request.temperature().or(self.default_temperature),
            max_tokens: request.max_output_tokens(),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiService {
    fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    async fn complete(&self, request: CompletionRequest) -> CompletionResult<String> {
        let payload = self.build_payload(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            CompletionError::malformed(format!("failed to encode OpenAI request: {err}"))
        })?;

        let http_request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| {
                CompletionError::unavailable(format!("failed to build OpenAI request: {err}"))
            })?;

        let response = self.client.request(http_request).await.map_err(|err| {
            CompletionError::unavailable(format!("OpenAI request failed: {err}"))
        })?;

        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            CompletionError::unavailable(format!("failed to read OpenAI response: {err}"))
        })?;
        debug!(label = request.label(), %status, bytes = bytes.len(), "OpenAI responded");

        if !status.is_success() {
            return Err(map_status(status, &String::from_utf8_lossy(&bytes)));
        }

        extract_content(&bytes)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_status(status: StatusCode, body: &str) -> CompletionError {
    let reason = format!("OpenAI returned {status}: {}", body.trim());
    if status == StatusCode::REQUEST_TIMEOUT {
        // The server gave up before answering; no deadline of ours applies.
        CompletionError::Timeout {
            after: Duration::ZERO,
        }
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        CompletionError::unavailable(reason)
    } else {
        CompletionError::malformed(reason)
    }
}

fn extract_content(bytes: &[u8]) -> CompletionResult<String> {
    let response: ChatCompletionResponse = serde_json::from_slice(bytes).map_err(|err| {
        CompletionError::malformed(format!("failed to decode OpenAI response: {err}"))
    })?;

    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.and_then(|message| message.content))
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| CompletionError::malformed("OpenAI response contained no text"))
}

/// Pooled client trusting the bundled web PKI roots. Plain `http://` is
/// accepted for local gateways.
fn https_client() -> HttpsClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));
    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    let connector = HttpsConnector::from((http, Arc::new(tls)));

    Client::builder()
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .build(connector)
}

fn sanitize_base_url(input: &str) -> Result<String, OpenAiSetupError> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(OpenAiSetupError::InvalidBaseUrl {
            reason: "must start with http:// or https://".into(),
        });
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| OpenAiSetupError::InvalidBaseUrl {
            reason: err.to_string(),
        })?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OpenAiService {
        let config = OpenAiConfig::new("gpt-4o-mini")
            .with_default_temperature(0.3)
            .with_api_key("test_key");
        OpenAiService::new(config).expect("service")
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");
        assert!(matches!(err, OpenAiSetupError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let cfg = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("https://example.com/openai")
            .expect("valid URL");
        assert_eq!(cfg.base_url, "https://example.com/openai/");
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = OpenAiService::new(OpenAiConfig::new("gpt-4o-mini")).unwrap_err();
        assert_eq!(err, OpenAiSetupError::MissingApiKey);
    }

    #[test]
    fn debug_output_redacts_key() {
        let cfg = OpenAiConfig::new("gpt-4o-mini").with_api_key("sk-secret");
        assert!(!format!("{cfg:?}").contains("sk-secret"));
    }

    #[test]
    fn payload_carries_system_and_user_messages() {
        let request = CompletionRequest::new("Write it", "test")
            .with_system_prompt("You are a helpful, concise assistant.")
            .with_max_output_tokens(400);
        let payload = service().build_payload(&request);

        assert_eq!(payload.model, "gpt-4o-mini");
        let roles: Vec<&str> = payload.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user"]);
        assert_eq!(payload.messages[1].content, "Write it");
        assert_eq!(payload.temperature, Some(0.3));
        assert_eq!(payload.max_tokens, Some(400));
    }

    #[test]
    fn content_is_extracted_and_trimmed() {
        let json = br#"{"choices": [{"message": {"content": "  ## Hi\n"}}]}"#;
        assert_eq!(extract_content(json).unwrap(), "## Hi");
    }

    #[test]
    fn empty_or_undecodable_bodies_are_malformed() {
        for body in [&b"not json"[..], br#"{"choices": []}"#, br#"{"choices": [{"message": {"content": " "}}]}"#] {
            let err = extract_content(body).unwrap_err();
            assert!(matches!(err, CompletionError::MalformedResponse { .. }));
        }
    }

    #[test]
    fn statuses_map_onto_the_error_taxonomy() {
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, ""),
            CompletionError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, ""),
            CompletionError::ServiceUnavailable { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::REQUEST_TIMEOUT, ""),
            CompletionError::Timeout { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "bad key"),
            CompletionError::MalformedResponse { .. }
        ));
    }
}
