//! Council parameters - use case behavior control.
//!
//! [`CouncilParams`] groups the static parameters that control how the
//! blocking and streaming orchestrators run. These are application-layer
//! concerns, not domain policy.

use std::time::Duration;

/// Default ceiling for the streaming orchestrator's wait on stage 1
pub const DEFAULT_FIRST_ANSWER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CouncilParams {
    /// Run stage 2 at all. When false every run behaves as if fewer than
    /// two answers succeeded.
    pub enable_review: bool,
    /// Streaming only: wait for stage 2 before choosing the synthesizer.
    pub await_reviews: bool,
    /// Streaming only: how long the foreground waits for stage 1 (and for
    /// stage 2 when `await_reviews` is set).
    pub first_answer_timeout: Duration,
}

impl Default for CouncilParams {
    fn default() -> Self {
        Self {
            enable_review: true,
            await_reviews: false,
            first_answer_timeout: DEFAULT_FIRST_ANSWER_TIMEOUT,
        }
    }
}

impl CouncilParams {
    // ==================== Builder Methods ====================

    pub fn with_review(mut self, enabled: bool) -> Self {
        self.enable_review = enabled;
        self
    }

    pub fn with_await_reviews(mut self, await_reviews: bool) -> Self {
        self.await_reviews = await_reviews;
        self
    }

    pub fn with_first_answer_timeout(mut self, timeout: Duration) -> Self {
        self.first_answer_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = CouncilParams::default();
        assert!(params.enable_review);
        assert!(!params.await_reviews);
        assert_eq!(params.first_answer_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder() {
        let params = CouncilParams::default()
            .with_review(false)
            .with_await_reviews(true)
            .with_first_answer_timeout(Duration::from_secs(5));

        assert!(!params.enable_review);
        assert!(params.await_reviews);
        assert_eq!(params.first_answer_timeout, Duration::from_secs(5));
    }
}
