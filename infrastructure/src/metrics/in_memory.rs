//! Process-wide metrics store with time-boxed entries.
//!
//! Every observation is stamped on arrival. A background task started with
//! the store purges entries older than the retention window on a fixed
//! interval, and reads skip expired entries even between purges, so memory
//! stays bounded under sustained load.

use council_application::MetricsSink;
use council_domain::Stage;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Observation {
    StageDuration {
        stage: Stage,
        duration: Duration,
    },
    TokenUsage {
        provider: String,
        tokens: u64,
    },
    ProviderOutcome {
        provider: String,
        success: bool,
        latency: Duration,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    recorded_at: Instant,
    query_id: String,
    observation: Observation,
}

/// Aggregated durations for one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

impl StageStats {
    pub fn mean_ms(&self) -> u64 {
        self.total_ms.checked_div(self.count).unwrap_or(0)
    }
}

/// Aggregated calls for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub calls: u64,
    pub failures: u64,
    pub output_tokens: u64,
    pub total_latency_ms: u64,
}

/// Summary over the live (unexpired) entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries: usize,
    pub stages: BTreeMap<String, StageStats>,
    pub providers: BTreeMap<String, ProviderStats>,
}

pub struct InMemoryMetrics {
    entries: RwLock<VecDeque<Entry>>,
    retention: Duration,
    cancel: CancellationToken,
}

impl InMemoryMetrics {
    /// Create a store without a purge task. Reads still honor `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            retention,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a store and spawn its purge task on the current runtime.
    ///
    /// The task stops when [`shutdown`](Self::shutdown) is called or the
    /// store is dropped.
    pub fn start(retention: Duration, purge_interval: Duration) -> Arc<Self> {
        let store = Arc::new(Self::new(retention));
        let weak = Arc::downgrade(&store);
        let cancel = store.cancel.clone();
        tokio::spawn(purge_loop(weak, purge_interval, cancel));
        debug!(?retention, ?purge_interval, "Metrics purge task started");
        store
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Number of stored entries, expired ones included until the next purge
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_at(Instant::now())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.recorded_at) < self.retention
    }

    fn purge_at(&self, now: Instant) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        // Entries arrive in time order, so expired ones sit at the front
        while entries.front().is_some_and(|e| !self.is_live(e, now)) {
            entries.pop_front();
        }
        before - entries.len()
    }

    fn snapshot_at(&self, now: Instant) -> MetricsSnapshot {
        let Ok(entries) = self.entries.read() else {
            return MetricsSnapshot::default();
        };

        let mut snapshot = MetricsSnapshot::default();
        let mut queries = HashSet::new();

        for entry in entries.iter().filter(|e| self.is_live(e, now)) {
            queries.insert(entry.query_id.as_str());
            match &entry.observation {
                Observation::StageDuration { stage, duration } => {
                    let ms = millis(*duration);
                    let stats = snapshot.stages.entry(stage.as_str().to_string()).or_default();
                    stats.count += 1;
                    stats.total_ms += ms;
                    stats.max_ms = stats.max_ms.max(ms);
                }
                Observation::TokenUsage { provider, tokens } => {
                    snapshot.providers.entry(provider.clone()).or_default().output_tokens += tokens;
                }
                Observation::ProviderOutcome {
                    provider,
                    success,
                    latency,
                } => {
                    let stats = snapshot.providers.entry(provider.clone()).or_default();
                    stats.calls += 1;
                    if !success {
                        stats.failures += 1;
                    }
                    stats.total_latency_ms += millis(*latency);
                }
            }
        }

        snapshot.queries = queries.len();
        snapshot
    }

    fn push(&self, query_id: &str, observation: Observation) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push_back(Entry {
                recorded_at: Instant::now(),
                query_id: query_id.to_string(),
                observation,
            });
        }
    }
}

impl Drop for InMemoryMetrics {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for InMemoryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetrics")
            .field("entries", &self.len())
            .field("retention", &self.retention)
            .finish()
    }
}

async fn purge_loop(store: Weak<InMemoryMetrics>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let purged = store.purge_expired();
                if purged > 0 {
                    trace!(purged, remaining = store.len(), "Purged expired metrics");
                }
            }
        }
    }
    debug!("Metrics purge task stopped");
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl MetricsSink for InMemoryMetrics {
    fn record_stage_duration(&self, query_id: &str, stage: Stage, duration: Duration) {
        self.push(query_id, Observation::StageDuration { stage, duration });
    }

    fn record_token_usage(&self, query_id: &str, provider: &str, _model: &str, tokens: u64) {
        self.push(
            query_id,
            Observation::TokenUsage {
                provider: provider.to_string(),
                tokens,
            },
        );
    }

    fn record_provider_outcome(
        &self,
        query_id: &str,
        provider: &str,
        success: bool,
        latency: Duration,
    ) {
        self.push(
            query_id,
            Observation::ProviderOutcome {
                provider: provider.to_string(),
                success,
                latency,
            },
        );
    }
}
