//! Anthropic Messages API backend.

use super::http::{self, build_client, malformed, transport_error};
use super::sse::decode_text_stream;
use async_trait::async_trait;
use council_application::{BackendAdapter, BackendError, Completion, TextStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    id: String,
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            max_tokens,
            timeout,
            client: build_client(timeout)?,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn request<'a>(
        &self,
        model: &'a str,
        system: &'a str,
        user: &'a str,
        stream: bool,
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response, BackendError> {
        debug!(provider = %self.id, model = body.model, stream = body.stream, "POST {}", self.endpoint());

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        http::send(builder, self.timeout, !body.stream).await
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    output_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: TextDelta },
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Concatenate the text blocks of a non-streaming response
pub(crate) fn parse_message(body: &str) -> Result<Completion, BackendError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| malformed("message", e))?;

    let mut blocks = response.content.into_iter().filter(|b| b.kind == "text").peekable();
    if blocks.peek().is_none() {
        return Err(BackendError::MalformedResponse(
            "response has no text content".into(),
        ));
    }
    let text: String = blocks.map(|b| b.text).collect();

    let completion = Completion::new(text);
    Ok(match response.usage.and_then(|u| u.output_tokens) {
        Some(tokens) => completion.with_output_tokens(tokens),
        None => completion,
    })
}

/// Extract text from one streamed event; only `content_block_delta` carries any
pub(crate) fn parse_event(data: &str) -> Result<Option<String>, BackendError> {
    match serde_json::from_str(data).map_err(|e| malformed("stream event", e))? {
        StreamEvent::ContentBlockDelta { delta } => Ok(delta.text),
        StreamEvent::Error { error } => Err(BackendError::Other(error.message)),
        StreamEvent::Other => Ok(None),
    }
}

#[async_trait]
impl BackendAdapter for AnthropicBackend {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<Completion, BackendError> {
        let response = self.send(&self.request(model, system, user, false)).await?;
        let body = response.text().await.map_err(transport_error)?;
        parse_message(&body)
    }

    async fn stream_generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<TextStream, BackendError> {
        let response = self.send(&self.request(model, system, user, true)).await?;
        let body = response.bytes_stream().map(|chunk| chunk.map_err(transport_error));
        Ok(decode_text_stream(body, self.timeout, parse_event))
    }
}
