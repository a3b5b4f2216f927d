//! OpenAI-compatible chat completions backend.
//!
//! Covers OpenAI itself and any service speaking the same protocol
//! (Gemini's compatibility endpoint, local inference servers). The base URL
//! carries the API version, e.g. `https://api.openai.com/v1`.

use super::http::{self, build_client, malformed, transport_error};
use super::sse::decode_text_stream;
use async_trait::async_trait;
use council_application::{BackendAdapter, BackendError, Completion, TextStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    id: String,
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
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
        format!("{}/chat/completions", self.base_url)
    }

    fn request<'a>(
        &self,
        model: &'a str,
        system: &'a str,
        user: &'a str,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            stream,
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, BackendError> {
        debug!(provider = %self.id, model = body.model, stream = body.stream, "POST {}", self.endpoint());

        let mut builder = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        http::send(builder, self.timeout, !body.stream).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Extract the answer from a non-streaming response body
pub(crate) fn parse_completion(body: &str) -> Result<Completion, BackendError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| malformed("chat completion", e))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| BackendError::MalformedResponse("response has no choices".into()))?;

    let completion = Completion::new(text);
    Ok(match response.usage.and_then(|u| u.completion_tokens) {
        Some(tokens) => completion.with_output_tokens(tokens),
        None => completion,
    })
}

/// Extract the text fragment from one streamed chunk
pub(crate) fn parse_chunk(data: &str) -> Result<Option<String>, BackendError> {
    let chunk: ChatChunk = serde_json::from_str(data).map_err(|e| malformed("stream chunk", e))?;
    if let Some(error) = chunk.error {
        return Err(BackendError::Other(error.message));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content))
}

#[async_trait]
impl BackendAdapter for OpenAiCompatibleBackend {
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
        parse_completion(&body)
    }

    async fn stream_generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<TextStream, BackendError> {
        let response = self.send(&self.request(model, system, user, true)).await?;
        let body = response.bytes_stream().map(|chunk| chunk.map_err(transport_error));
        Ok(decode_text_stream(body, self.timeout, parse_chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> OpenAiCompatibleBackend {
        OpenAiCompatibleBackend::new("openai", base_url, None, 512, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_version_path() {
        assert_eq!(
            backend("https://api.openai.com/v1/").endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            backend("https://generativelanguage.googleapis.com/v1beta/openai").endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let backend = backend("http://localhost:8080/v1");
        let body = serde_json::to_value(backend.request("gpt-4o", "be brief", "hi", false)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("stream").is_none());

        let streaming = serde_json::to_value(backend.request("gpt-4o", "s", "u", true)).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Rest and fluids."}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.text, "Rest and fluids.");
        assert_eq!(completion.output_tokens, Some(4));
    }

    #[test]
    fn test_parse_completion_rejects_empty_choices() {
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(BackendError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_chunk() {
        let delta = r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_chunk(delta).unwrap().as_deref(), Some("Hel"));

        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_chunk(role_only).unwrap(), None);

        let finish = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_chunk(finish).unwrap(), None);

        let error = r#"{"error":{"message":"rate limited","type":"requests"}}"#;
        assert!(matches!(parse_chunk(error), Err(BackendError::Other(m)) if m == "rate limited"));
    }
}
