//! Council behavior from TOML (`[council]` section)

use council_application::CouncilParams;
use council_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw council configuration from TOML
///
/// # Example
///
/// ```toml
/// [council]
/// enable_review = true
/// await_reviews = false          # streaming: wait for stage 2 before synthesis
/// first_answer_timeout_secs = 60 # streaming: ceiling on the stage-1 wait
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub enable_review: bool,
    pub await_reviews: bool,
    pub first_answer_timeout_secs: u64,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        Self {
            enable_review: true,
            await_reviews: false,
            first_answer_timeout_secs: 60,
        }
    }
}

impl FileCouncilConfig {
    /// Convert to application parameters, collecting issues.
    ///
    /// A zero timeout falls back to the default.
    pub fn to_params(&self) -> (CouncilParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut params = CouncilParams::default()
            .with_review(self.enable_review)
            .with_await_reviews(self.await_reviews);

        if self.first_answer_timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroValue {
                    field: "council.first_answer_timeout_secs".to_string(),
                },
                "council.first_answer_timeout_secs: must be positive, using the default",
            ));
        } else {
            params = params
                .with_first_answer_timeout(Duration::from_secs(self.first_answer_timeout_secs));
        }

        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_params() {
        let config = FileCouncilConfig {
            enable_review: false,
            await_reviews: true,
            first_answer_timeout_secs: 15,
        };
        let (params, issues) = config.to_params();
        assert!(issues.is_empty());
        assert!(!params.enable_review);
        assert!(params.await_reviews);
        assert_eq!(params.first_answer_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_zero_timeout_warns_and_keeps_default() {
        let config = FileCouncilConfig {
            first_answer_timeout_secs: 0,
            ..Default::default()
        };
        let (params, issues) = config.to_params();
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
        assert_eq!(params.first_answer_timeout, Duration::from_secs(60));
    }
}
