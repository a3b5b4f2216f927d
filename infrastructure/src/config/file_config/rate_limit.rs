//! Request gate settings from TOML (`[rate_limit]` section)

use super::logging::expand_home;
use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const STATE_FILE: &str = "rate_limit.json";

/// Sliding-window limit on queries per conversation id.
///
/// `max_requests = 0` disables the limit. Admitted queries are recorded in
/// `state_file` so that separate runs share one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
    /// Defaults to `rate_limit.json` under the local data directory
    pub state_file: Option<String>,
}

impl Default for FileRateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 0,
            window_secs: 60,
            state_file: None,
        }
    }
}

impl FileRateLimitConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Where admitted queries are recorded; `None` when no data directory
    /// exists and none is configured
    pub fn state_path(&self) -> Option<PathBuf> {
        match self.state_file.as_deref() {
            Some(path) => Some(expand_home(path)),
            None => dirs::data_local_dir().map(|d| d.join("llm-council").join(STATE_FILE)),
        }
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.is_enabled() && self.window_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue {
                    field: "rate_limit.window_secs".to_string(),
                },
                "rate_limit.window_secs must be positive when max_requests is set",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_state_file() {
        let config = FileRateLimitConfig {
            max_requests: 5,
            state_file: Some("/var/lib/council/limits.json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.state_path(),
            Some(PathBuf::from("/var/lib/council/limits.json"))
        );
    }

    #[test]
    fn test_default_state_file_under_data_dir() {
        let config = FileRateLimitConfig::default();
        if let Some(data) = dirs::data_local_dir() {
            assert_eq!(
                config.state_path(),
                Some(data.join("llm-council").join(STATE_FILE))
            );
        }
    }
}
