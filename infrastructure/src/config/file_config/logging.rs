//! Logging settings from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for JSONL council transcripts; unset disables them
    pub conversation_log_dir: Option<String>,
    /// Directory for daily-rolling diagnostic logs (`--log-dir` wins)
    pub log_dir: Option<String>,
}

impl FileLoggingConfig {
    pub fn conversation_log_dir(&self) -> Option<PathBuf> {
        self.conversation_log_dir.as_deref().map(expand_home)
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_deref().map(expand_home)
    }
}

/// Expand a leading `~/` to the home directory
pub(super) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/log/council"), PathBuf::from("/var/log/council"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/logs"), home.join("logs"));
        }
    }
}
