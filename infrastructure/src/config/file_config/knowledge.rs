//! Knowledge entries from TOML (`[[knowledge]]` array)

use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// One reference snippet for the knowledge enhancer.
///
/// # Example
///
/// ```toml
/// [[knowledge]]
/// domain = "healthcare"
/// source = "AHA 2017 guideline"
/// keywords = ["hypertension", "blood pressure"]
/// text = "Stage 1 hypertension is 130-139 / 80-89 mmHg."
///
/// [[knowledge]]
/// domain = "finance"
/// source = "house style"
/// path = "docs/finance-notes.md"   # read once at startup
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileKnowledgeEntry {
    pub domain: String,
    /// Provenance label reported with the result
    pub source: String,
    /// Match when the query mentions any of these (case-insensitive).
    /// Empty matches every query of the domain.
    pub keywords: Vec<String>,
    pub text: Option<String>,
    pub path: Option<String>,
}

impl FileKnowledgeEntry {
    pub(super) fn validate(&self, index: usize) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.domain.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyName {
                    field: format!("knowledge[{}].domain", index),
                },
                format!("knowledge[{}]: domain cannot be empty", index),
            ));
        }

        if self.text.is_none() && self.path.is_none() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::EmptyName {
                    field: format!("knowledge[{}].text", index),
                },
                format!("knowledge[{}]: neither text nor path is set, entry ignored", index),
            ));
        }

        issues
    }
}
