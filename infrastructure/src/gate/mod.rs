//! Request gate adapters.

mod rate_limiter;

pub use rate_limiter::WindowedRateLimiter;

use crate::config::FileRateLimitConfig;
use council_application::{OpenGate, RequestGate};

/// The gate for a `[rate_limit]` section: a persistent limiter when
/// enabled, otherwise one that admits every query
pub fn build_gate(config: &FileRateLimitConfig) -> Box<dyn RequestGate> {
    match WindowedRateLimiter::from_config(config) {
        Some(limiter) => Box::new(limiter),
        None => Box::new(OpenGate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::Query;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_gate_admits_everything() {
        let gate = build_gate(&FileRateLimitConfig::default());
        let query = Query::new("q", "general").unwrap();
        for _ in 0..5 {
            assert!(gate.check(&query).allowed);
        }
    }

    #[test]
    fn test_enabled_gate_limits_across_builds() {
        let dir = TempDir::new().unwrap();
        let config = FileRateLimitConfig {
            max_requests: 2,
            window_secs: 60,
            state_file: Some(dir.path().join("limits.json").to_string_lossy().into_owned()),
        };
        let query = Query::new("q", "general").unwrap();

        // A fresh gate per invocation, as the binary builds one per run
        assert!(build_gate(&config).check(&query).allowed);
        assert!(build_gate(&config).check(&query).allowed);
        assert!(!build_gate(&config).check(&query).allowed);
    }
}
