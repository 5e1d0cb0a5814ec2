//! Application state management
//!
//! Author: hephaex@gmail.com

use ask_core::{AnswerEngine, AppConfig};
use ask_engine::{CacheStats, EngineHandle};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Answer engine
    pub engine: Arc<dyn AnswerEngine>,
    /// Answer cache counters, when caching is enabled
    pub cache_stats: Option<Arc<CacheStats>>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Questions forwarded to the engine
    pub ask_count: AtomicU64,
    /// Questions the engine failed to answer
    pub ask_failures: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Per-endpoint request metrics
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

/// Request metrics for one route
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    pub status_counts: HashMap<u16, u64>,
    pub latency_count: u64,
    pub total_latency_us: u64,
    pub max_latency_us: u64,
}

/// Serializable view of [`EndpointMetrics`]
#[derive(Debug, Serialize)]
pub struct EndpointReport {
    pub requests: u64,
    pub statuses: BTreeMap<u16, u64>,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl EndpointMetrics {
    pub fn report(&self) -> EndpointReport {
        let avg_latency_ms = if self.latency_count > 0 {
            self.total_latency_us as f64 / self.latency_count as f64 / 1000.0
        } else {
            0.0
        };

        EndpointReport {
            requests: self.latency_count,
            statuses: self.status_counts.iter().map(|(s, c)| (*s, *c)).collect(),
            avg_latency_ms,
            max_latency_ms: self.max_latency_us as f64 / 1000.0,
        }
    }
}

impl AppState {
    /// Create application state from config and a built engine
    pub fn new(config: AppConfig, handle: EngineHandle) -> Self {
        let mut state = Self::with_engine(config, handle.engine);
        state.cache_stats = handle.cache_stats;
        state
    }

    /// Create application state around an engine, without cache counters
    pub fn with_engine(config: AppConfig, engine: Arc<dyn AnswerEngine>) -> Self {
        Self {
            config,
            engine,
            cache_stats: None,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            ask_count: AtomicU64::new(0),
            ask_failures: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Count a question forwarded to the engine
    pub fn record_ask(&self) {
        self.ask_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a question the engine failed on
    pub fn record_ask_failure(&self) {
        self.ask_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Record one finished request
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        self.increment_requests();

        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        *entry.status_counts.entry(status).or_insert(0) += 1;
        entry.latency_count += 1;
        entry.total_latency_us += latency_us;
        entry.max_latency_us = entry.max_latency_us.max(latency_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ask_core::{Answer, Result};

    struct NoopEngine;

    #[async_trait::async_trait]
    impl AnswerEngine for NoopEngine {
        async fn answer(&self, _question: &str, _k: usize) -> Result<Answer> {
            Ok(Answer::new("", vec![]))
        }

        fn name(&self) -> &str {
            "noop"
        }
    }

    #[tokio::test]
    async fn test_record_request_aggregates_per_endpoint() {
        let state = AppState::with_engine(AppConfig::default(), Arc::new(NoopEngine));

        state.record_request("/ask".to_string(), 200, 1_000).await;
        state.record_request("/ask".to_string(), 500, 3_000).await;
        state.record_request("/health".to_string(), 200, 10).await;

        assert_eq!(state.get_request_count(), 3);

        let metrics = state.metrics.read().await;
        let report = metrics["/ask"].report();
        assert_eq!(report.requests, 2);
        assert_eq!(report.statuses[&200], 1);
        assert_eq!(report.statuses[&500], 1);
        assert_eq!(report.avg_latency_ms, 2.0);
        assert_eq!(report.max_latency_ms, 3.0);
    }

    #[test]
    fn test_ready_flag() {
        let state = AppState::with_engine(AppConfig::default(), Arc::new(NoopEngine));
        assert!(state.is_ready());
        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
