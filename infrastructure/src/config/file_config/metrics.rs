//! Metrics store settings from TOML (`[metrics]` section)

use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMetricsConfig {
    /// How long a recorded entry is kept
    pub retention_secs: u64,
    /// How often expired entries are purged
    pub purge_interval_secs: u64,
}

impl Default for FileMetricsConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            purge_interval_secs: 300,
        }
    }
}

impl FileMetricsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs.max(1))
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }

    pub(super) fn validate(&self) -> Vec<ConfigIssue> {
        [
            ("metrics.retention_secs", self.retention_secs),
            ("metrics.purge_interval_secs", self.purge_interval_secs),
        ]
        .into_iter()
        .filter(|(_, value)| *value == 0)
        .map(|(field, _)| {
            ConfigIssue::warning(
                ConfigIssueCode::ZeroValue {
                    field: field.to_string(),
                },
                format!("{}: must be positive, using 1", field),
            )
        })
        .collect()
    }
}
