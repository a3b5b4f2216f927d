//! Provider configuration from TOML (`[providers.<id>]` sections)

use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire protocols the adapters speak
pub const PROVIDER_KINDS: &[&str] = &["openai", "anthropic"];

/// One backend provider.
///
/// # Example
///
/// ```toml
/// [providers.local]
/// kind = "openai"                      # any OpenAI-compatible host
/// base_url = "http://localhost:8000/v1"
/// api_key_env = "LOCAL_API_KEY"
/// timeout_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Wire protocol: "openai" or "anthropic"
    pub kind: String,
    /// Base URL. For "openai" it includes the version path (e.g. `/v1`).
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    /// Max tokens per response
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            kind: "openai".to_string(),
            base_url: String::new(),
            api_key_env: None,
            api_key: None,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl FileProviderConfig {
    fn builtin(kind: &str, base_url: &str, api_key_env: &str) -> Self {
        Self {
            kind: kind.to_string(),
            base_url: base_url.to_string(),
            api_key_env: Some(api_key_env.to_string()),
            ..Default::default()
        }
    }

    /// API key from `api_key`, or else from the `api_key_env` variable
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub(super) fn validate(&self, id: &str) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if id.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyName {
                    field: "providers".to_string(),
                },
                "providers: provider id cannot be empty",
            ));
        }

        if !PROVIDER_KINDS.contains(&self.kind.to_lowercase().as_str()) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidEnumValue {
                    field: format!("providers.{}.kind", id),
                    value: self.kind.clone(),
                    valid_values: PROVIDER_KINDS.iter().map(|k| k.to_string()).collect(),
                },
                format!("providers.{}.kind: unknown value '{}'", id, self.kind),
            ));
        }

        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyName {
                    field: format!("providers.{}.base_url", id),
                },
                format!("providers.{}.base_url cannot be empty", id),
            ));
        }

        for (field, value) in [
            ("timeout_secs", self.timeout_secs),
            ("max_tokens", u64::from(self.max_tokens)),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroValue {
                        field: format!("providers.{}.{}", id, field),
                    },
                    format!("providers.{}.{} must be positive", id, field),
                ));
            }
        }

        issues
    }
}

/// The providers used by the built-in domain profiles
pub fn default_providers() -> BTreeMap<String, FileProviderConfig> {
    BTreeMap::from([
        (
            "openai".to_string(),
            FileProviderConfig::builtin("openai", "https://api.openai.com/v1", "OPENAI_API_KEY"),
        ),
        (
            "anthropic".to_string(),
            FileProviderConfig::builtin(
                "anthropic",
                "https://api.anthropic.com",
                "ANTHROPIC_API_KEY",
            ),
        ),
        (
            "google".to_string(),
            FileProviderConfig::builtin(
                "openai",
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "GEMINI_API_KEY",
            ),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_providers_are_valid() {
        for (id, provider) in default_providers() {
            assert!(provider.validate(&id).is_empty(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let provider = FileProviderConfig {
            kind: "bedrock".to_string(),
            timeout_secs: 0,
            ..Default::default()
        };
        let issues = provider.validate("aws");
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(ConfigIssue::is_error));
        assert!(matches!(
            &issues[0].code,
            ConfigIssueCode::InvalidEnumValue { value, .. } if value == "bedrock"
        ));
    }

    #[test]
    fn test_resolve_api_key_prefers_direct_key() {
        let provider = FileProviderConfig {
            api_key: Some("sk-direct".to_string()),
            api_key_env: Some("COUNCIL_TEST_UNSET_KEY_VAR".to_string()),
            ..Default::default()
        };
        assert_eq!(provider.resolve_api_key().as_deref(), Some("sk-direct"));

        let from_env = FileProviderConfig {
            api_key_env: Some("COUNCIL_TEST_UNSET_KEY_VAR".to_string()),
            ..Default::default()
        };
        assert_eq!(from_env.resolve_api_key(), None);
    }
}
