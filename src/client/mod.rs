//! Provider clients and the chat dispatcher.
//!
//! The [`Dispatcher`] trait is the seam between the front-ends and the
//! network: it takes the prompt, decorators, history and generation settings
//! for one turn and returns the assistant's reply text.
//! [`ProviderDispatcher`] implements it over HTTP by routing each request to
//! the Anthropic or OpenAI client according to the selected engine.

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{EngineDescriptor, Message, MessageRole, ProviderKind};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the dispatcher needs for one turn.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// The user's prompt for this turn.
    pub prompt: &'a str,
    /// Decorator texts for the session.
    pub decorators: &'a [String],
    /// Conversation so far, normally ending with the prompt as a user message.
    pub history: &'a [Message],
    /// Engine to dispatch to.
    pub engine: &'a EngineDescriptor,
    /// Model identifier.
    pub model: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl<'a> ChatRequest<'a> {
    /// The messages to send: the history, plus the prompt as a trailing user
    /// message if the history does not already end with it.
    pub fn conversation(&self) -> Cow<'a, [Message]> {
        match self.history.last() {
            Some(last) if last.role == MessageRole::User && last.content == self.prompt => {
                Cow::Borrowed(self.history)
            }
            _ => {
                let mut messages = self.history.to_vec();
                messages.push(Message::user(self.prompt));
                Cow::Owned(messages)
            }
        }
    }

    /// The system preamble: the history's system messages joined by blank
    /// lines, or the decorators when the history carries none.
    pub fn system_preamble(&self) -> Option<String> {
        let from_history: Vec<&str> = self
            .history
            .iter()
            .filter(|message| message.is_system())
            .map(|message| message.content.as_str())
            .collect();
        let parts: Vec<&str> = if from_history.is_empty() {
            self.decorators.iter().map(String::as_str).collect()
        } else {
            from_history
        };
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Tracks whether the system preamble has reached the provider in this
/// session.
///
/// Providers without a persistent system role need the preamble re-sent;
/// the session resets this state between turns for them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PreambleState {
    delivered: bool,
}

impl PreambleState {
    /// A state in which the preamble has not been delivered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the preamble still needs to be sent.
    pub fn needs_preamble(&self) -> bool {
        !self.delivered
    }

    /// Returns true if the preamble has been sent.
    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Records that the preamble has been sent.
    pub fn mark_delivered(&mut self) {
        self.delivered = true;
    }

    /// Forgets delivery so the next request carries the preamble again.
    pub fn reset(&mut self) {
        self.delivered = false;
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the request.
    pub input_tokens: u64,
    /// Tokens generated.
    pub output_tokens: u64,
}

/// A provider's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The assistant text.
    pub text: String,
    /// Token usage, when reported.
    pub usage: Option<Usage>,
}

/// Sends one turn of conversation to a model and returns the reply text.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Performs the request, consulting and updating `preamble`.
    async fn chat(&self, request: ChatRequest<'_>, preamble: &mut PreambleState) -> Result<String>;
}

/// Dispatcher that talks to the real provider APIs.
#[derive(Debug, Clone)]
pub struct ProviderDispatcher {
    client: ReqwestClient,
    timeout: Duration,
}

impl ProviderDispatcher {
    /// Create a dispatcher with the default request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a dispatcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client, timeout })
    }

    async fn send(
        &self,
        kind: ProviderKind,
        api_key: String,
        request: &ChatRequest<'_>,
        preamble: &mut PreambleState,
    ) -> Result<Reply> {
        let base_url = request.engine.base_url.as_deref();
        let client = self.client.clone();
        match kind {
            ProviderKind::Anthropic => {
                AnthropicClient::with_http_client(client, api_key, base_url, self.timeout)?
                    .send(request, preamble)
                    .await
            }
            ProviderKind::OpenAi => {
                OpenAiClient::with_http_client(client, api_key, base_url, self.timeout)?
                    .send(request, preamble)
                    .await
            }
        }
    }
}

#[async_trait]
impl Dispatcher for ProviderDispatcher {
    async fn chat(&self, request: ChatRequest<'_>, preamble: &mut PreambleState) -> Result<String> {
        let engine = request.engine;
        let kind = engine.provider_kind().ok_or_else(|| {
            Error::validation(
                format!("engine {} does not name a known provider", engine.name),
                Some("provider".to_string()),
            )
        })?;
        let api_key = api_key_for(engine)?;
        tracing::debug!(
            engine = %engine.name,
            provider = %kind,
            model = request.model,
            messages = request.history.len(),
            "dispatching chat request"
        );

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.send(kind, api_key, &request, preamble).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(reply) => {
                if let Some(usage) = reply.usage {
                    tracing::info!(
                        engine = %engine.name,
                        model = request.model,
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "chat reply received"
                    );
                }
                Ok(reply.text)
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(engine = %engine.name, error = %err, "chat request failed");
                Err(err)
            }
        }
    }
}

/// Reads the engine's API key from the environment.
pub fn api_key_for(engine: &EngineDescriptor) -> Result<String> {
    let Some(variable) = engine.api_key_variable() else {
        return Err(Error::authentication(format!(
            "engine {} names no api_key_name",
            engine.name
        )));
    };
    match env::var(variable) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::authentication(format!(
            "API key not provided and {variable} environment variable not set"
        ))),
    }
}

/// Joins `path` onto a base URL, treating the base as a directory.
pub(crate) fn endpoint(base_url: Option<&str>, default: &str, path: &str) -> Result<Url> {
    let base = base_url.unwrap_or(default);
    let base = if base.ends_with('/') {
        Url::parse(base)?
    } else {
        Url::parse(&format!("{base}/"))?
    };
    Ok(base.join(path)?)
}

/// Converts a transport failure into our error type.
pub(crate) fn send_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::timeout(
            format!("Request timed out: {}", e),
            Some(timeout.as_secs_f64()),
        )
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
    }
}

/// Process API response errors and convert to our Error type.
///
/// Both providers report failures as `{"error": {"type", "message", "param"}}`.
pub(crate) async fn process_error_response(response: Response) -> Error {
    let status = response.status();
    let status_code = status.as_u16();

    let request_id = response
        .headers()
        .get("x-request-id")
        .or_else(|| response.headers().get("request-id"))
        .and_then(|val| val.to_str().ok())
        .map(String::from);

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<u64>().ok());

    #[derive(Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(rename = "type")]
        error_type: Option<String>,
        message: Option<String>,
        param: Option<String>,
    }

    let error_body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            );
        }
    };

    let parsed_error = serde_json::from_str::<ErrorResponse>(&error_body)
        .ok()
        .and_then(|e| e.error);
    let error_type = parsed_error.as_ref().and_then(|e| e.error_type.clone());
    let error_message = parsed_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| error_body.clone());
    let error_param = parsed_error.as_ref().and_then(|e| e.param.clone());

    match status_code {
        400 => Error::bad_request(error_message, error_param),
        401 => Error::authentication(error_message),
        403 => Error::permission(error_message),
        404 => Error::not_found(error_message),
        408 => Error::timeout(error_message, None),
        429 => Error::rate_limit(error_message, retry_after),
        500 => Error::internal_server(error_message, request_id),
        502..=504 => Error::service_unavailable(error_message, retry_after),
        _ => Error::api(status_code, error_type, error_message, request_id),
    }
}
