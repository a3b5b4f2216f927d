//! HTTP backend adapters and the registry built from configuration.

pub mod anthropic;
mod http;
pub mod openai;
pub mod sse;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiCompatibleBackend;

use crate::config::FileProviderConfig;
use council_application::{BackendAdapter, BackendError, BackendRegistry};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Wire protocol spoken by a configured provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(BackendError::Other(format!("unknown provider kind '{}'", other))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build one adapter from its `[providers.<id>]` section
pub fn build_backend(
    id: &str,
    config: &FileProviderConfig,
) -> Result<Arc<dyn BackendAdapter>, BackendError> {
    let kind: ProviderKind = config.kind.parse()?;
    let api_key = config.resolve_api_key();
    if api_key.is_none() {
        // Still registered: calls fail individually and the council carries on
        warn!(
            provider = id,
            env = config.api_key_env.as_deref().unwrap_or("-"),
            "No API key configured; requests to this provider will likely be rejected"
        );
    }

    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    let backend: Arc<dyn BackendAdapter> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiCompatibleBackend::new(
            id,
            &config.base_url,
            api_key,
            config.max_tokens,
            timeout,
        )?),
        ProviderKind::Anthropic => Arc::new(AnthropicBackend::new(
            id,
            &config.base_url,
            api_key,
            config.max_tokens,
            timeout,
        )?),
    };
    Ok(backend)
}

/// Register an adapter for every configured provider
pub fn build_registry(
    providers: &BTreeMap<String, FileProviderConfig>,
) -> Result<BackendRegistry, BackendError> {
    let mut registry = BackendRegistry::new();
    for (id, config) in providers {
        registry.register(build_backend(id, config)?);
        info!(provider = %id, kind = %config.kind, base_url = %config.base_url, "Registered backend");
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_providers;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert!("bedrock".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
    }

    #[test]
    fn test_build_registry_from_defaults() {
        let registry = build_registry(&default_providers()).unwrap();
        assert_eq!(registry.provider_ids(), vec!["anthropic", "google", "openai"]);
        assert_eq!(registry.get("google").unwrap().provider_id(), "google");
    }

    #[test]
    fn test_build_registry_rejects_unknown_kind() {
        let mut providers = BTreeMap::new();
        providers.insert(
            "mystery".to_string(),
            FileProviderConfig {
                kind: "carrier-pigeon".to_string(),
                base_url: "http://localhost".to_string(),
                ..Default::default()
            },
        );
        assert!(build_registry(&providers).is_err());
    }
}
