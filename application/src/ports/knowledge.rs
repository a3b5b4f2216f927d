//! Knowledge enhancer port
//!
//! Supplies domain reference text that is prepended to the stage-1 prompt.

use async_trait::async_trait;
use council_domain::Domain;

/// Reference text for one query, with provenance labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeContext {
    pub text: String,
    pub sources: Vec<String>,
}

impl KnowledgeContext {
    pub fn new(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            text: text.into(),
            sources,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is no usable text; the query is then sent unmodified
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Looks up reference material for a query.
///
/// Lookups cannot fail from the caller's point of view: an adapter that hits
/// an error logs it and returns an empty context.
#[async_trait]
pub trait KnowledgeEnhancer: Send + Sync {
    async fn get_context(&self, query: &str, domain: &Domain) -> KnowledgeContext;
}

/// Enhancer that never adds context
pub struct NoKnowledge;

#[async_trait]
impl KnowledgeEnhancer for NoKnowledge {
    async fn get_context(&self, _query: &str, _domain: &Domain) -> KnowledgeContext {
        KnowledgeContext::empty()
    }
}
