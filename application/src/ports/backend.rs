//! Backend adapter port
//!
//! Defines the interface for calling a text-generation provider, and the
//! registry that maps provider ids to adapters.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while calling a backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// A finished, non-streaming generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Output token count as reported by the provider, if it reports one
    pub output_tokens: Option<u64>,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            output_tokens: None,
        }
    }

    pub fn with_output_tokens(mut self, tokens: u64) -> Self {
        self.output_tokens = Some(tokens);
        self
    }

    /// Reported token count, or a rough estimate of four characters per token
    pub fn token_count(&self) -> u64 {
        self.output_tokens
            .unwrap_or_else(|| self.text.chars().count().div_ceil(4) as u64)
    }
}

/// Lazy, finite stream of text fragments.
///
/// Dropping it releases the underlying transport.
pub type TextStream = BoxStream<'static, Result<String, BackendError>>;

/// One external text-generation provider.
///
/// Adapters keep no state between calls, so a single instance is shared by
/// every concurrent request.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Provider id this adapter is registered under (e.g. "openai")
    fn provider_id(&self) -> &str;

    /// Generate a complete response
    async fn generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<Completion, BackendError>;

    /// Generate a response as a stream of text fragments.
    ///
    /// The default implementation yields the whole `generate` result as a
    /// single fragment.
    async fn stream_generate(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<TextStream, BackendError> {
        let completion = self.generate(model, system, user).await?;
        Ok(stream::once(async move { Ok(completion.text) }).boxed())
    }
}

/// Maps provider ids to adapters. Built once at startup.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    adapters: HashMap<String, Arc<dyn BackendAdapter>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own provider id, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) {
        self.adapters
            .insert(adapter.provider_id().to_string(), adapter);
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn BackendAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn BackendAdapter>> {
        self.adapters.get(provider).cloned()
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.adapters.contains_key(provider)
    }

    /// Registered provider ids, sorted
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    struct EchoBackend(&'static str);

    #[async_trait]
    impl BackendAdapter for EchoBackend {
        fn provider_id(&self) -> &str {
            self.0
        }

        async fn generate(
            &self,
            model: &str,
            _system: &str,
            user: &str,
        ) -> Result<Completion, BackendError> {
            Ok(Completion::new(format!("{}:{}", model, user)))
        }
    }

    #[test]
    fn test_token_count_prefers_reported_value() {
        assert_eq!(Completion::new("abcdefgh").token_count(), 2);
        assert_eq!(Completion::new("abcdefghi").token_count(), 3);
        assert_eq!(Completion::new("abc").with_output_tokens(42).token_count(), 42);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = BackendRegistry::new()
            .with_adapter(Arc::new(EchoBackend("openai")))
            .with_adapter(Arc::new(EchoBackend("anthropic")));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("openai"));
        assert!(registry.get("google").is_none());
        assert_eq!(registry.provider_ids(), vec!["anthropic", "openai"]);
    }

    #[tokio::test]
    async fn test_default_stream_is_single_fragment() {
        let backend = EchoBackend("openai");
        let fragments: Vec<String> = backend
            .stream_generate("gpt-4o", "sys", "hi")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(fragments, vec!["gpt-4o:hi".to_string()]);
    }
}
