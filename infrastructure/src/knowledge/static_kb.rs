//! Knowledge base built from `[[knowledge]]` config entries.
//!
//! Snippets are loaded once at startup; files named by `path` are read then
//! and never again. A lookup returns every snippet of the query's domain
//! whose keywords appear in the query, in configuration order.

use crate::config::FileKnowledgeEntry;
use async_trait::async_trait;
use council_application::{KnowledgeContext, KnowledgeEnhancer};
use council_domain::Domain;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One piece of reference text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeSnippet {
    pub source: String,
    /// Lowercased; empty matches every query
    pub keywords: Vec<String>,
    pub text: String,
}

impl KnowledgeSnippet {
    pub fn new(source: impl Into<String>, keywords: &[&str], text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            text: text.into(),
        }
    }

    fn matches(&self, query_lower: &str) -> bool {
        self.keywords.is_empty() || self.keywords.iter().any(|k| query_lower.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase {
    snippets: HashMap<Domain, Vec<KnowledgeSnippet>>,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snippet(mut self, domain: Domain, snippet: KnowledgeSnippet) -> Self {
        self.snippets.entry(domain).or_default().push(snippet);
        self
    }

    /// Build from config entries, resolving relative paths against `base_dir`.
    ///
    /// Entries whose file cannot be read are skipped with a warning.
    pub fn from_entries(entries: &[FileKnowledgeEntry], base_dir: &Path) -> Self {
        let mut base = Self::new();

        for entry in entries {
            let Some(text) = Self::load_text(entry, base_dir) else {
                continue;
            };
            if text.trim().is_empty() {
                debug!(source = %entry.source, "Skipping empty knowledge entry");
                continue;
            }

            let source = if entry.source.trim().is_empty() {
                entry.path.clone().unwrap_or_else(|| entry.domain.clone())
            } else {
                entry.source.clone()
            };
            let keywords: Vec<&str> = entry.keywords.iter().map(String::as_str).collect();
            base = base.with_snippet(
                Domain::from(entry.domain.as_str()),
                KnowledgeSnippet::new(source, &keywords, text),
            );
        }

        debug!("Loaded {} knowledge snippets", base.len());
        base
    }

    fn load_text(entry: &FileKnowledgeEntry, base_dir: &Path) -> Option<String> {
        if let Some(text) = &entry.text {
            return Some(text.clone());
        }
        let path = base_dir.join(entry.path.as_deref()?);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Could not read knowledge file {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snippets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snippets of `domain` relevant to `query`
    pub fn lookup(&self, query: &str, domain: &Domain) -> Vec<&KnowledgeSnippet> {
        let query_lower = query.to_lowercase();
        self.snippets
            .get(domain)
            .map(|snippets| snippets.iter().filter(|s| s.matches(&query_lower)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl KnowledgeEnhancer for StaticKnowledgeBase {
    async fn get_context(&self, query: &str, domain: &Domain) -> KnowledgeContext {
        let matched = self.lookup(query, domain);
        if matched.is_empty() {
            return KnowledgeContext::empty();
        }

        let text = matched
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sources: Vec<String> = Vec::new();
        for snippet in &matched {
            if !sources.contains(&snippet.source) {
                sources.push(snippet.source.clone());
            }
        }

        debug!(domain = %domain, ?sources, "Knowledge context found");
        KnowledgeContext::new(text, sources)
    }
}
