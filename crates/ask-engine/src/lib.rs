//! Ask Engine - Answer engine bindings
//!
//! The retrieval-augmented generation engine lives outside this workspace.
//! This crate provides the ways of reaching it:
//! - `RemoteAnswerEngine`: the engine served over HTTP
//! - `CachedEngine`: an optional in-memory answer cache in front of any engine
//!
//! Author: hephaex@gmail.com

use ask_core::{AnswerEngine, AppConfig, CacheConfig, EngineKind, Result};
use std::sync::Arc;

pub mod cache;
pub mod remote;

pub use cache::{CacheStats, CacheStatsReport, CachedEngine};
pub use remote::RemoteAnswerEngine;

/// Engine built from configuration, plus cache counters when caching is on
pub struct EngineHandle {
    pub engine: Arc<dyn AnswerEngine>,
    pub cache_stats: Option<Arc<CacheStats>>,
}

/// Create the configured answer engine
pub fn create_engine(config: &AppConfig) -> Result<EngineHandle> {
    let engine: Arc<dyn AnswerEngine> = match config.engine.kind {
        EngineKind::Remote => {
            let remote = RemoteAnswerEngine::from_config(&config.engine)?;
            tracing::info!(endpoint = remote.endpoint(), "Using remote answer engine");
            Arc::new(remote)
        }
    };

    Ok(wrap_engine(engine, &config.cache))
}

/// Put the answer cache in front of `engine` when `cache.enabled` is set
pub fn wrap_engine(engine: Arc<dyn AnswerEngine>, cache: &CacheConfig) -> EngineHandle {
    if !cache.enabled {
        return EngineHandle {
            engine,
            cache_stats: None,
        };
    }

    let cached = CachedEngine::new(engine, cache);
    let cache_stats = Some(cached.stats());
    tracing::info!(
        capacity = cache.max_capacity,
        ttl_secs = cache.ttl_secs,
        "Answer cache enabled"
    );

    EngineHandle {
        engine: Arc::new(cached),
        cache_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_engine_without_cache() {
        let handle = create_engine(&AppConfig::default()).unwrap();
        assert_eq!(handle.engine.name(), "remote");
        assert!(handle.cache_stats.is_none());
    }

    #[test]
    fn test_create_engine_with_cache() {
        let mut config = AppConfig::default();
        config.cache.enabled = true;

        let handle = create_engine(&config).unwrap();
        assert_eq!(handle.engine.name(), "remote");
        assert!(handle.cache_stats.is_some());
    }

    #[test]
    fn test_wrap_engine_respects_enabled_flag() {
        let remote: Arc<dyn AnswerEngine> =
            Arc::new(RemoteAnswerEngine::from_config(&Default::default()).unwrap());

        let off = wrap_engine(Arc::clone(&remote), &CacheConfig::default());
        assert!(off.cache_stats.is_none());
        assert!(Arc::ptr_eq(&off.engine, &remote));

        let on = wrap_engine(remote, &CacheConfig {
            enabled: true,
            ..Default::default()
        });
        assert_eq!(on.cache_stats.unwrap().hits(), 0);
    }
}
