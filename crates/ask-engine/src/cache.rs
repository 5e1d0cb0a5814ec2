//! Answer caching
//!
//! Wraps any [`AnswerEngine`] and serves repeated `(question, k)` pairs from
//! memory. Only successful answers are stored.
//!
//! Uses the moka crate for thread-safe, async-compatible caching
//! with TTL support.
//!
//! Author: hephaex@gmail.com

use ask_core::{Answer, AnswerEngine, CacheConfig, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Caching decorator for an answer engine
pub struct CachedEngine {
    inner: Arc<dyn AnswerEngine>,
    cache: Cache<(String, usize), Answer>,
    stats: Arc<CacheStats>,
}

impl CachedEngine {
    /// Wrap `inner` with a cache sized by `config`
    pub fn new(inner: Arc<dyn AnswerEngine>, config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();

        Self {
            inner,
            cache,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Drop every cached answer
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl AnswerEngine for CachedEngine {
    async fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        let key = (question.to_string(), k);

        if let Some(hit) = self.cache.get(&key).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(k, "Answer served from cache");
            return Ok(hit);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let answer = self.inner.answer(question, k).await?;
        self.cache.insert(key, answer.clone()).await;
        self.stats.writes.fetch_add(1, Ordering::Relaxed);

        Ok(answer)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Counters for cache performance monitoring
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Hit rate in 0.0..=1.0, 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Point-in-time copy for reporting
    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.hits(),
            misses: self.misses(),
            writes: self.writes(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Serializable snapshot of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub hit_rate: f64,
}
