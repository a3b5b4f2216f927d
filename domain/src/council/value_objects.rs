//! Council value objects - immutable result types for each stage.
//!
//! - [`ExpertAnswer`] - one backend's stage-1 answer
//! - [`PeerReview`] - one backend's ranking of another backend's answer
//! - [`SynthesisResult`] - the stage-3 synthesized answer
//! - [`CouncilResult`] - the complete result of one council run

use crate::core::domain::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the sentinel text carried by failed answers and reviews
pub const ERROR_MARKER: &str = "[error]";

/// Answer from a single backend in stage 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpertAnswer {
    pub provider: String,
    pub model: String,
    /// The answer, or the sentinel error text when `succeeded` is false
    pub text: String,
    pub succeeded: bool,
}

impl ExpertAnswer {
    pub fn success(
        provider: impl Into<String>,
        model: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            text: text.into(),
            succeeded: true,
        }
    }

    /// A failed answer; the error message is folded into the sentinel text
    pub fn failure(
        provider: impl Into<String>,
        model: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            text: format!("{} {}", ERROR_MARKER, error),
            succeeded: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.succeeded
    }

    /// The error message of a failed answer
    pub fn error_message(&self) -> Option<&str> {
        if self.succeeded {
            None
        } else {
            Some(
                self.text
                    .strip_prefix(ERROR_MARKER)
                    .map(str::trim_start)
                    .unwrap_or(&self.text),
            )
        }
    }
}

/// How a review's rank was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// The reviewer's response contained a usable rank
    Parsed,
    /// The response could not be parsed; the rank is the default
    Unparseable,
    /// The review call itself failed; the rank is the default
    Failed,
}

/// Ranking of one backend's answer by another backend (stage 2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReview {
    pub reviewer: String,
    pub target: String,
    /// Always within `[1, N]`, N = number of succeeded stage-1 answers
    pub rank: u32,
    pub reasoning: String,
    pub status: ReviewStatus,
}

impl PeerReview {
    pub fn new(
        reviewer: impl Into<String>,
        target: impl Into<String>,
        rank: u32,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            reviewer: reviewer.into(),
            target: target.into(),
            rank,
            reasoning: reasoning.into(),
            status: ReviewStatus::Parsed,
        }
    }

    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = status;
        self
    }
}

/// Final synthesized answer (stage 3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub provider: String,
    pub model: String,
    pub synthesis: String,
}

impl SynthesisResult {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        synthesis: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            synthesis: synthesis.into(),
        }
    }
}

/// Wall-clock duration of each stage, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub stage1_ms: u64,
    pub stage2_ms: u64,
    pub stage3_ms: u64,
    pub total_ms: u64,
}

impl StageTimings {
    pub fn new(stage1_ms: u64, stage2_ms: u64, stage3_ms: u64) -> Self {
        Self {
            stage1_ms,
            stage2_ms,
            stage3_ms,
            total_ms: stage1_ms + stage2_ms + stage3_ms,
        }
    }
}

/// Complete result of one council run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilResult {
    pub query_id: String,
    pub domain: Domain,
    pub original_query: String,
    pub stage1: Vec<ExpertAnswer>,
    pub stage2: Vec<PeerReview>,
    pub stage3: SynthesisResult,
    pub timings: StageTimings,
    pub timestamp: DateTime<Utc>,
    /// Provenance labels from the knowledge enhancer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

impl CouncilResult {
    /// Returns an iterator over only the successful answers.
    pub fn successful_answers(&self) -> impl Iterator<Item = &ExpertAnswer> {
        self.stage1.iter().filter(|a| a.succeeded)
    }

    /// Returns an iterator over only the failed answers.
    pub fn failed_answers(&self) -> impl Iterator<Item = &ExpertAnswer> {
        self.stage1.iter().filter(|a| !a.succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_sentinel() {
        let answer = ExpertAnswer::failure("openai", "gpt-4o", "connection refused");
        assert!(!answer.is_success());
        assert!(answer.text.starts_with(ERROR_MARKER));
        assert_eq!(answer.error_message(), Some("connection refused"));
    }

    #[test]
    fn test_success_has_no_error_message() {
        let answer = ExpertAnswer::success("openai", "gpt-4o", "Blood pressure...");
        assert!(answer.is_success());
        assert_eq!(answer.error_message(), None);
    }

    #[test]
    fn test_timings_total_is_sum() {
        let t = StageTimings::new(120, 340, 560);
        assert_eq!(t.total_ms, 1020);
    }

    #[test]
    fn test_review_status_serializes_snake_case() {
        let review = PeerReview::new("a", "b", 1, "good").with_status(ReviewStatus::Unparseable);
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["status"], "unparseable");
    }
}
