//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::{AppState, EndpointReport};
use ask_engine::CacheStatsReport;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub version: String,
    /// Name of the configured answer engine
    #[schema(example = "remote")]
    pub engine: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.engine.name().to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub engine: String,
    pub cache_enabled: bool,
}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let is_ready = state.is_ready();

    let response = ReadinessResponse {
        ready: is_ready,
        engine: state.engine.name().to_string(),
        cache_enabled: state.cache_stats.is_some(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// JSON metrics response
#[derive(Serialize)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub ask_requests: u64,
    pub ask_failures: u64,
    /// Answers served from the cache, 0 when caching is off
    pub cache_hits: u64,
    /// Answers fetched from the engine through the cache, 0 when caching is off
    pub cache_misses: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatsReport>,
    pub endpoints: BTreeMap<String, EndpointReport>,
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    let endpoints = state
        .metrics
        .read()
        .await
        .iter()
        .map(|(endpoint, m)| (endpoint.clone(), m.report()))
        .collect();

    let cache = state.cache_stats.as_ref().map(|s| s.report());

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        ask_requests: state.ask_count.load(Ordering::SeqCst),
        ask_failures: state.ask_failures.load(Ordering::SeqCst),
        cache_hits: cache.map_or(0, |c| c.hits),
        cache_misses: cache.map_or(0, |c| c.misses),
        cache,
        endpoints,
    })
}
