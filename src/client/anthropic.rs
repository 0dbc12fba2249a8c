use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ChatRequest, PreambleState, Reply, Usage, endpoint, process_error_response, send_error};
use crate::error::{Error, Result};
use crate::types::MessageRole;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
///
/// Anthropic takes the system prompt as a top-level `system` field rather than
/// as messages, so `system` entries in the history are lifted out of the
/// message list. The preamble is attached only while the session's
/// [`PreambleState`] says it is still needed.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: ReqwestClient,
    url: Url,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicClient {
    /// Create a client that shares an existing HTTP connection pool.
    pub fn with_http_client(
        client: ReqwestClient,
        api_key: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = endpoint(base_url, DEFAULT_API_URL, "messages")?;
        Ok(Self {
            api_key,
            client,
            url,
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| Error::authentication("API key is not a valid header value"))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_API_VERSION),
        );
        Ok(headers)
    }

    /// Send one turn and return the concatenated text of the reply.
    pub async fn send(
        &self,
        request: &ChatRequest<'_>,
        preamble: &mut PreambleState,
    ) -> Result<Reply> {
        let conversation = request.conversation();
        let body = build_request(request, &conversation, preamble.needs_preamble());

        let response = self
            .client
            .post(self.url.clone())
            .headers(self.default_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(process_error_response(response).await);
        }
        if body.system.is_some() {
            preamble.mark_delivered();
        }

        let parsed = response.json::<MessagesResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<String>();
        Ok(Reply {
            text,
            usage: parsed.usage.map(|usage| Usage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            }),
        })
    }
}

/// Builds the request body. System messages never appear in `messages`; they
/// are sent as `system` only when `include_preamble` is set.
pub(crate) fn build_request<'a>(
    request: &ChatRequest<'a>,
    conversation: &'a [crate::types::Message],
    include_preamble: bool,
) -> MessagesRequest<'a> {
    let messages = conversation
        .iter()
        .filter(|message| !message.is_system())
        .map(|message| WireMessage {
            role: message.role,
            content: &message.content,
        })
        .collect();
    MessagesRequest {
        model: request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        system: if include_preamble {
            request.system_preamble()
        } else {
            None
        },
        messages,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::test_server::{request_body, serve_once};
    use crate::types::{EngineDescriptor, Message, ProviderKind};

    fn client(api_key: &str, base: &str) -> AnthropicClient {
        AnthropicClient::with_http_client(
            ReqwestClient::new(),
            api_key.to_string(),
            Some(base),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn engine(base_url: Option<String>) -> EngineDescriptor {
        EngineDescriptor {
            name: "anthropic".to_string(),
            models: Vec::new(),
            default_model: "claude-sonnet-4-0".to_string(),
            api_key_name: None,
            provider: Some(ProviderKind::Anthropic),
            base_url,
        }
    }

    fn chat<'a>(
        engine: &'a EngineDescriptor,
        history: &'a [Message],
        decorators: &'a [String],
        prompt: &'a str,
    ) -> ChatRequest<'a> {
        ChatRequest {
            prompt,
            decorators,
            history,
            engine,
            model: "claude-sonnet-4-0",
            temperature: 0.25,
            max_tokens: 512,
        }
    }

    #[test]
    fn system_messages_are_lifted() {
        let engine = engine(None);
        let history = vec![
            Message::system("be terse"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("again"),
        ];
        let request = chat(&engine, &history, &[], "again");
        let conversation = request.conversation();
        let body = build_request(&request, &conversation, true);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "claude-sonnet-4-0",
                "max_tokens": 512,
                "temperature": 0.25,
                "system": "be terse",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "again"},
                ]
            })
        );

        let body = build_request(&request, &conversation, false);
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("system").is_none());
        assert_eq!(value["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn send_delivers_preamble_once() {
        let reply = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "id": "t", "name": "x", "input": {}},
                {"type": "text", "text": " there"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 3}
        });
        let (base, server) = serve_once("200 OK", reply.to_string()).await;
        let engine = engine(Some(base.clone()));
        let decorators = vec!["decorator".to_string()];
        let history = vec![Message::system("decorator"), Message::user("hi")];
        let client = client("key", &base);
        let mut preamble = PreambleState::new();

        let reply = client
            .send(&chat(&engine, &history, &decorators, "hi"), &mut preamble)
            .await
            .unwrap();
        assert_eq!(reply.text, "Hello there");
        assert_eq!(
            reply.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
        assert!(preamble.is_delivered());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/messages "));
        let lower = raw.to_ascii_lowercase();
        assert!(lower.contains("x-api-key: key"));
        assert!(lower.contains("anthropic-version: 2023-06-01"));
        let body = request_body(&raw);
        assert_eq!(body["system"], "decorator");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "hi"}]));
    }

    #[tokio::test]
    async fn failed_send_keeps_preamble_pending() {
        let error = json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        });
        let (base, server) = serve_once("401 Unauthorized", error.to_string()).await;
        let engine = engine(Some(base.clone()));
        let history = vec![Message::user("hi")];
        let decorators = vec!["decorator".to_string()];
        let client = client("bad", &base);
        let mut preamble = PreambleState::new();
        let err = client
            .send(&chat(&engine, &history, &decorators, "hi"), &mut preamble)
            .await
            .unwrap_err();
        server.await.unwrap();
        assert!(err.is_authentication());
        assert!(preamble.needs_preamble());
    }

    #[test]
    fn invalid_key_is_reported_without_panicking() {
        let client = AnthropicClient::with_http_client(
            ReqwestClient::new(),
            "bad\nkey".into(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(client.default_headers().unwrap_err().is_authentication());
    }
}
