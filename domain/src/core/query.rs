//! Query value object

use super::domain::Domain;
use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// Maximum query length, in characters
pub const MAX_QUERY_CHARS: usize = 10_000;

/// A question submitted to the council (Value Object)
///
/// Immutable once accepted. Construction validates the text length so the
/// orchestrators can consume it read-only without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuery")]
pub struct Query {
    text: String,
    domain: Domain,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<String>,
}

impl Query {
    /// Create a new query, rejecting blank or oversized text
    pub fn new(text: impl Into<String>, domain: impl Into<Domain>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::InvalidQuery(
                "query text cannot be empty".to_string(),
            ));
        }
        let len = text.chars().count();
        if len > MAX_QUERY_CHARS {
            return Err(DomainError::InvalidQuery(format!(
                "query text is {} characters (max {})",
                len, MAX_QUERY_CHARS
            )));
        }
        Ok(Self {
            text,
            domain: domain.into(),
            conversation_id: None,
        })
    }

    /// Attach the caller's conversation identifier
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }
}

/// Unvalidated wire form of [`Query`]
#[derive(Deserialize)]
struct RawQuery {
    text: String,
    domain: Domain,
    #[serde(default)]
    conversation_id: Option<String>,
}

impl TryFrom<RawQuery> for Query {
    type Error = DomainError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let query = Query::new(raw.text, raw.domain)?;
        Ok(match raw.conversation_id {
            Some(id) => query.with_conversation_id(id),
            None => query,
        })
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.domain, self.text)
    }
}
