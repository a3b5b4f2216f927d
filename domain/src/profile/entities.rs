//! Domain profile entities

use crate::core::domain::Domain;
use serde::{Deserialize, Serialize};

/// One backend to consult: a provider id paired with a model id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Registered provider id (e.g. "openai", "anthropic")
    pub provider: String,
    /// Provider-specific model identifier
    pub model: String,
}

impl BackendSpec {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Display for BackendSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Static per-domain configuration (Entity)
///
/// Loaded once at process start and never mutated. `backends` is ordered:
/// the order is the deterministic tie-break for synthesizer selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainProfile {
    pub domain: Domain,
    pub system_prompt: String,
    pub backends: Vec<BackendSpec>,
    /// Shown alongside answers in regulated domains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl DomainProfile {
    pub fn new(domain: Domain, system_prompt: impl Into<String>) -> Self {
        Self {
            domain,
            system_prompt: system_prompt.into(),
            backends: Vec::new(),
            disclaimer: None,
        }
    }

    pub fn with_backend(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        let spec = BackendSpec::new(provider, model);
        // A provider appears at most once; a later entry replaces the model
        if let Some(existing) = self.backends.iter_mut().find(|b| b.provider == spec.provider) {
            existing.model = spec.model;
        } else {
            self.backends.push(spec);
        }
        self
    }

    pub fn with_disclaimer(mut self, disclaimer: impl Into<String>) -> Self {
        self.disclaimer = Some(disclaimer.into());
        self
    }

    /// Find the model configured for a provider
    pub fn model_for(&self, provider: &str) -> Option<&str> {
        self.backends
            .iter()
            .find(|b| b.provider == provider)
            .map(|b| b.model.as_str())
    }

    /// Provider ids in profile order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.provider.as_str())
    }

    /// Built-in profile for a standard domain
    pub fn builtin(domain: &Domain) -> Option<Self> {
        let profile = match domain {
            Domain::General => Self::new(Domain::General, GENERAL_PROMPT),
            Domain::Healthcare => Self::new(Domain::Healthcare, HEALTHCARE_PROMPT)
                .with_disclaimer(HEALTHCARE_DISCLAIMER),
            Domain::Finance => {
                Self::new(Domain::Finance, FINANCE_PROMPT).with_disclaimer(FINANCE_DISCLAIMER)
            }
            Domain::Custom(_) => return None,
        };
        Some(
            profile
                .with_backend("openai", "gpt-4o")
                .with_backend("anthropic", "claude-3-5-sonnet-latest")
                .with_backend("google", "gemini-1.5-pro"),
        )
    }
}

const GENERAL_PROMPT: &str = "You are a knowledgeable expert. Answer accurately and concisely, \
support your points with reasoning, and say so when you are unsure.";

const HEALTHCARE_PROMPT: &str = "You are a careful medical expert. Give evidence-based \
information, distinguish established consensus from emerging research, and never present \
general information as a diagnosis.";

const FINANCE_PROMPT: &str = "You are an experienced financial analyst. Explain concepts \
precisely, state assumptions and risks explicitly, and avoid recommending specific trades.";

const HEALTHCARE_DISCLAIMER: &str =
    "This information is educational and is not a substitute for professional medical advice.";

const FINANCE_DISCLAIMER: &str =
    "This information is educational and does not constitute financial advice.";
