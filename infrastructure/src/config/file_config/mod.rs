//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod council;
mod domains;
mod knowledge;
mod logging;
mod metrics;
mod output;
mod providers;
mod rate_limit;

pub use council::FileCouncilConfig;
pub use domains::{FileBackendConfig, FileDomainConfig};
pub use knowledge::FileKnowledgeEntry;
pub use logging::FileLoggingConfig;
pub use metrics::FileMetricsConfig;
pub use output::FileOutputConfig;
pub use providers::{FileProviderConfig, PROVIDER_KINDS, default_providers};
pub use rate_limit::FileRateLimitConfig;

use council_application::CouncilParams;
use council_domain::{ConfigIssue, ConfigIssueCode, Domain, DomainCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raised when a configuration has at least one error-level issue
#[derive(Debug, Error)]
#[error("invalid configuration:\n{}", format_issues(.issues))]
pub struct ConfigValidationError {
    pub issues: Vec<ConfigIssue>,
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Review toggle and streaming wait ceilings
    pub council: FileCouncilConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Backend providers by id
    pub providers: BTreeMap<String, FileProviderConfig>,
    /// Domain profile overrides and custom domains by name
    pub domains: BTreeMap<String, FileDomainConfig>,
    /// Reference snippets for the knowledge enhancer
    pub knowledge: Vec<FileKnowledgeEntry>,
    /// Metrics store settings
    pub metrics: FileMetricsConfig,
    /// Request gate settings
    pub rate_limit: FileRateLimitConfig,
    /// Log file locations
    pub logging: FileLoggingConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            council: FileCouncilConfig::default(),
            output: FileOutputConfig::default(),
            providers: default_providers(),
            domains: BTreeMap::new(),
            knowledge: Vec::new(),
            metrics: FileMetricsConfig::default(),
            rate_limit: FileRateLimitConfig::default(),
            logging: FileLoggingConfig::default(),
        }
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks each section on its own, then that every backend of every
    /// effective domain profile names a configured provider.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.council.to_params().1);

        for (id, provider) in &self.providers {
            issues.extend(provider.validate(id));
        }

        for (name, domain) in &self.domains {
            issues.extend(domain.validate(name));
        }

        for (index, entry) in self.knowledge.iter().enumerate() {
            issues.extend(entry.validate(index));
        }

        issues.extend(self.metrics.validate());
        issues.extend(self.rate_limit.validate());

        for profile in self.to_catalog().profiles() {
            for provider in profile.providers() {
                if !self.providers.contains_key(provider) {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::UnknownProvider {
                            domain: profile.domain.to_string(),
                            provider: provider.to_string(),
                        },
                        format!(
                            "domains.{}: provider '{}' has no [providers.{}] section",
                            profile.domain, provider, provider
                        ),
                    ));
                }
            }
        }

        issues
    }

    /// Validate and fail on error-level issues; returns the warnings
    pub fn ensure_valid(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(ConfigIssue::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError { issues: errors })
        }
    }

    /// Built-in profiles overlaid with every `[domains.<name>]` section
    pub fn to_catalog(&self) -> DomainCatalog {
        self.domains
            .iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .fold(DomainCatalog::with_builtin(), |catalog, (name, config)| {
                catalog.with_profile(config.to_profile(Domain::from(name.as_str())))
            })
    }

    pub fn council_params(&self) -> CouncilParams {
        self.council.to_params().0
    }
}
