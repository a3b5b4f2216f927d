//! Metrics port
//!
//! Receives stage timings, token usage and per-provider outcomes. Recording
//! is synchronous and never fails the council run.

use council_domain::Stage;
use std::time::Duration;

pub trait MetricsSink: Send + Sync {
    /// Wall-clock duration of one stage of one query
    fn record_stage_duration(&self, query_id: &str, stage: Stage, duration: Duration);

    /// Output tokens produced by one call
    fn record_token_usage(&self, query_id: &str, provider: &str, model: &str, tokens: u64);

    /// Success or failure of one backend call, with its latency
    fn record_provider_outcome(
        &self,
        query_id: &str,
        provider: &str,
        success: bool,
        latency: Duration,
    );
}

/// No-op metrics sink
pub struct NoMetrics;

impl MetricsSink for NoMetrics {
    fn record_stage_duration(&self, _query_id: &str, _stage: Stage, _duration: Duration) {}
    fn record_token_usage(&self, _query_id: &str, _provider: &str, _model: &str, _tokens: u64) {}
    fn record_provider_outcome(
        &self,
        _query_id: &str,
        _provider: &str,
        _success: bool,
        _latency: Duration,
    ) {
    }
}
