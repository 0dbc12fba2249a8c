use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ChatRequest, PreambleState, Reply, Usage, endpoint, process_error_response, send_error};
use crate::error::{Error, Result};
use crate::types::Message;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";

/// Client for the OpenAI Chat Completions API.
///
/// The history, system messages included, is sent verbatim on every request.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: ReqwestClient,
    url: Url,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAiClient {
    /// Create a client that shares an existing HTTP connection pool.
    pub fn with_http_client(
        client: ReqwestClient,
        api_key: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = endpoint(base_url, DEFAULT_API_URL, "chat/completions")?;
        Ok(Self {
            api_key,
            client,
            url,
            timeout,
        })
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| Error::authentication("API key is not a valid header value"))?,
        );
        Ok(headers)
    }

    /// Send one turn and return the first choice's content.
    pub async fn send(
        &self,
        request: &ChatRequest<'_>,
        preamble: &mut PreambleState,
    ) -> Result<Reply> {
        let conversation = request.conversation();
        let body = build_request(request, &conversation);

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
        preamble.mark_delivered();

        let parsed = response.json::<CompletionResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        let usage = parsed.usage.map(|usage| Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        });
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(Error::unknown("completion response contained no choices"));
        };
        Ok(Reply {
            text: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

pub(crate) fn build_request<'a>(
    request: &ChatRequest<'a>,
    conversation: &'a [Message],
) -> CompletionRequest<'a> {
    CompletionRequest {
        model: request.model,
        messages: conversation,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}
