//! Sliding-window request limiter.
//!
//! Counts admitted queries per client key over the last `window`. The key is
//! the query's conversation id; queries without one share a single bucket.
//!
//! With a state file the window outlives the process: each check reloads the
//! recorded hits and writes them back after admitting a query.

use crate::config::FileRateLimitConfig;
use chrono::{DateTime, TimeDelta, Utc};
use council_application::{GateDecision, RequestGate};
use council_domain::Query;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

const SHARED_KEY: &str = "-";

type Hits = HashMap<String, VecDeque<DateTime<Utc>>>;

#[derive(Debug)]
pub struct WindowedRateLimiter {
    max_requests: u32,
    window: Duration,
    state_file: Option<PathBuf>,
    hits: Mutex<Hits>,
}

impl WindowedRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state_file: None,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// `None` when the config disables limiting
    pub fn from_config(config: &FileRateLimitConfig) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        let limiter = Self::new(config.max_requests, config.window());
        Some(match config.state_path() {
            Some(path) => limiter.with_state_file(path),
            None => {
                warn!("No data directory for rate limit state; limiting this process only");
                limiter
            }
        })
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    fn key(query: &Query) -> &str {
        query.conversation_id().unwrap_or(SHARED_KEY)
    }

    fn check_at(&self, key: &str, now: DateTime<Utc>) -> GateDecision {
        let Ok(mut hits) = self.hits.lock() else {
            warn!("Rate limiter state poisoned; admitting query");
            return GateDecision::allow();
        };

        if let Some(path) = &self.state_file
            && let Some(stored) = load_hits(path)
        {
            *hits = stored;
        }

        let window = TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX);
        // Empty buckets go so idle keys do not accumulate
        hits.retain(|_, times| {
            while times.front().is_some_and(|t| now - *t >= window) {
                times.pop_front();
            }
            !times.is_empty()
        });

        let times = hits.entry(key.to_string()).or_default();
        if times.len() >= self.max_requests as usize {
            let retry_after = times
                .front()
                .and_then(|oldest| window.checked_sub(&(now - *oldest)))
                .and_then(|left| left.to_std().ok())
                .unwrap_or(self.window);
            debug!(key, ?retry_after, "Query rate limited");
            return GateDecision::deny(format!(
                "Rate limit of {} queries per {}s exceeded; retry in {}s",
                self.max_requests,
                self.window.as_secs(),
                retry_after.as_secs().max(1)
            ));
        }

        times.push_back(now);
        if let Some(path) = &self.state_file {
            save_hits(path, &hits);
        }
        GateDecision::allow()
    }
}

/// Recorded hits, or `None` when there are none or they cannot be read
fn load_hits(path: &Path) -> Option<Hits> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Cannot read rate limit state {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(hits) => Some(hits),
        Err(e) => {
            warn!("Ignoring corrupt rate limit state {}: {}", path.display(), e);
            None
        }
    }
}

fn save_hits(path: &Path, hits: &Hits) {
    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| {
            let json = serde_json::to_string(hits).map_err(std::io::Error::other)?;
            std::fs::write(path, json)
        });
    if let Err(e) = written {
        warn!("Cannot write rate limit state {}: {}", path.display(), e);
    }
}

impl RequestGate for WindowedRateLimiter {
    fn check(&self, query: &Query) -> GateDecision {
        self.check_at(Self::key(query), Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn secs(n: i64) -> TimeDelta {
        TimeDelta::seconds(n)
    }

    #[test]
    fn test_denies_past_limit_then_recovers() {
        let limiter = WindowedRateLimiter::new(2, Duration::from_secs(60));
        let start = Utc::now();

        assert!(limiter.check_at("a", start).allowed);
        assert!(limiter.check_at("a", start + secs(1)).allowed);

        let denied = limiter.check_at("a", start + secs(2));
        assert!(!denied.allowed);
        assert!(denied.reason.unwrap().contains("retry in 58s"));

        // The first hit has left the window
        assert!(limiter.check_at("a", start + secs(60)).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = WindowedRateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();
        assert!(limiter.check_at("a", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
    }

    #[test]
    fn test_queries_keyed_by_conversation() {
        let limiter = WindowedRateLimiter::new(1, Duration::from_secs(60));
        let first = Query::new("q", "general").unwrap().with_conversation_id("c1");
        let second = Query::new("q", "general").unwrap().with_conversation_id("c2");
        let anonymous = Query::new("q", "general").unwrap();

        assert!(limiter.check(&first).allowed);
        assert!(!limiter.check(&first).allowed);
        assert!(limiter.check(&second).allowed);
        assert!(limiter.check(&anonymous).allowed);
        assert!(!limiter.check(&anonymous).allowed);
    }

    #[test]
    fn test_state_file_shared_between_limiters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("rate_limit.json");
        let query = Query::new("q", "general").unwrap();

        // Each limiter stands in for one run of the binary
        let first_run = WindowedRateLimiter::new(1, Duration::from_secs(60)).with_state_file(&path);
        assert!(first_run.check(&query).allowed);
        assert!(path.exists());

        let second_run = WindowedRateLimiter::new(1, Duration::from_secs(60)).with_state_file(&path);
        let denied = second_run.check(&query);
        assert!(!denied.allowed);
        assert!(denied.reason.unwrap().contains("1 queries per 60s"));
    }

    #[test]
    fn test_expired_hits_in_state_file_are_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rate_limit.json");
        let start = Utc::now();

        let earlier = WindowedRateLimiter::new(1, Duration::from_secs(60)).with_state_file(&path);
        assert!(earlier.check_at("-", start).allowed);

        let later = WindowedRateLimiter::new(1, Duration::from_secs(60)).with_state_file(&path);
        assert!(later.check_at("-", start + secs(61)).allowed);

        let stored: Hits = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["-"].len(), 1);
    }

    #[test]
    fn test_corrupt_state_file_admits_and_rewrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rate_limit.json");
        std::fs::write(&path, "not json").unwrap();

        let limiter = WindowedRateLimiter::new(1, Duration::from_secs(60)).with_state_file(&path);
        assert!(limiter.check_at("-", Utc::now()).allowed);
        assert!(load_hits(&path).is_some());
    }

    #[test]
    fn test_from_config_uses_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("limits.json");
        let config = FileRateLimitConfig {
            max_requests: 3,
            window_secs: 30,
            state_file: Some(path.to_string_lossy().into_owned()),
        };
        let limiter = WindowedRateLimiter::from_config(&config).unwrap();
        assert_eq!(limiter.state_file(), Some(path.as_path()));
    }

    #[test]
    fn test_disabled_by_config() {
        let config = FileRateLimitConfig {
            max_requests: 0,
            ..Default::default()
        };
        assert!(WindowedRateLimiter::from_config(&config).is_none());
    }
}
