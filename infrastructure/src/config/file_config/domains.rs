//! Domain profiles from TOML (`[domains.<name>]` sections)

use council_domain::{ConfigIssue, ConfigIssueCode, Domain, DomainProfile};
use serde::{Deserialize, Serialize};

const CUSTOM_DOMAIN_PROMPT: &str = "You are a knowledgeable expert in this field. Answer \
accurately and concisely, and say so when you are unsure.";

/// One `[[domains.<name>.backends]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBackendConfig {
    pub provider: String,
    pub model: String,
}

/// A domain profile override or a new custom domain.
///
/// For the standard domains (general, healthcare, finance) every field left
/// out falls back to the built-in profile.
///
/// # Example
///
/// ```toml
/// [domains.legal]
/// system_prompt = "You are a careful legal analyst."
/// disclaimer = "Not legal advice."
///
/// [[domains.legal.backends]]
/// provider = "openai"
/// model = "gpt-4o"
///
/// [[domains.legal.backends]]
/// provider = "anthropic"
/// model = "claude-3-5-sonnet-latest"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDomainConfig {
    pub system_prompt: Option<String>,
    pub disclaimer: Option<String>,
    /// Backends in priority order; replaces the built-in list when non-empty
    pub backends: Vec<FileBackendConfig>,
}

impl FileDomainConfig {
    /// Build the effective profile for `domain`
    pub fn to_profile(&self, domain: Domain) -> DomainProfile {
        let base = DomainProfile::builtin(&domain);

        let system_prompt = self
            .system_prompt
            .clone()
            .or_else(|| base.as_ref().map(|p| p.system_prompt.clone()))
            .unwrap_or_else(|| CUSTOM_DOMAIN_PROMPT.to_string());
        let disclaimer = self
            .disclaimer
            .clone()
            .or_else(|| base.as_ref().and_then(|p| p.disclaimer.clone()));

        let mut profile = DomainProfile::new(domain, system_prompt);
        if let Some(disclaimer) = disclaimer {
            profile = profile.with_disclaimer(disclaimer);
        }

        if self.backends.is_empty() {
            if let Some(base) = base {
                for spec in base.backends {
                    profile = profile.with_backend(spec.provider, spec.model);
                }
            }
        } else {
            for backend in &self.backends {
                profile = profile.with_backend(&backend.provider, &backend.model);
            }
        }

        profile
    }

    pub(super) fn validate(&self, name: &str) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let domain: Domain = name.into();

        if name.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyName {
                    field: "domains".to_string(),
                },
                "domains: domain name cannot be empty",
            ));
            return issues;
        }

        if !domain.is_standard() {
            if self.backends.is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::NoBackends {
                        domain: name.to_string(),
                    },
                    format!("domains.{}: a custom domain needs at least one backend", name),
                ));
            }
            if self.system_prompt.is_none() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::EmptyName {
                        field: format!("domains.{}.system_prompt", name),
                    },
                    format!("domains.{}: no system_prompt, using a generic one", name),
                ));
            }
        }

        for (i, backend) in self.backends.iter().enumerate() {
            for (field, value) in [("provider", &backend.provider), ("model", &backend.model)] {
                if value.trim().is_empty() {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::EmptyName {
                            field: format!("domains.{}.backends[{}].{}", name, i, field),
                        },
                        format!("domains.{}.backends[{}]: {} cannot be empty", name, i, field),
                    ));
                }
            }
        }

        issues
    }
}
