//! Metrics tracking middleware
//!
//! Records request counts, latency, and status codes per route for the
//! `/metrics` endpoint.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Bucket for requests that matched no route
const UNMATCHED: &str = "<unmatched>";

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    // Route templates keep the metric set bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}
