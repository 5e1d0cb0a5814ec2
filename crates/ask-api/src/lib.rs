//! Ask API - HTTP gateway
//!
//! Accepts questions over HTTP, forwards them to the answer engine, and
//! returns the answer with its supporting context.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router around shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = routes::api_routes()
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = middleware::cors_layer(&state.config.server) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// Router over a caller-supplied engine with default configuration
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing(engine: Arc<dyn ask_core::AnswerEngine>) -> Router {
    let state = AppState::with_engine(ask_core::AppConfig::default(), engine);
    create_router(Arc::new(state))
}
