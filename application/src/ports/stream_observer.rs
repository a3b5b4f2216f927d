//! Observer hooks for a streaming council run.
//!
//! All hooks are called from the task polling the event stream, never from
//! the background stage task.

use crate::use_cases::CouncilError;
use council_domain::{ExpertAnswer, PeerReview};

pub trait StreamObserver: Send + Sync {
    /// Stage-1 answers, in profile order
    fn on_stage1_complete(&self, _answers: &[ExpertAnswer]) {}

    /// Stage-2 reviews, once the background task has been joined
    fn on_stage2_complete(&self, _reviews: &[PeerReview]) {}

    fn on_token(&self, _text: &str) {}

    /// Failures that do not end the stream (e.g. the review task dying)
    /// as well as the one that does
    fn on_error(&self, _error: &CouncilError) {}
}

/// Observer that ignores every hook
pub struct NoObserver;

impl StreamObserver for NoObserver {}
