//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::error::ApiError;
use crate::handlers::{ask, health};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

/// OpenAPI document for the gateway
#[derive(OpenApi)]
#[openapi(
    info(title = "Ask Gateway", description = "Question answering over an external RAG engine"),
    paths(ask::ask_handler, health::health_check, health::readiness_check),
    components(schemas(
        ask::AskRequest,
        ask::AskResponse,
        ask::ContextItem,
        ApiError,
        health::HealthResponse,
        health::ReadinessResponse
    )),
    tags(
        (name = "ask", description = "Question answering"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create all gateway routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ask", post(ask::ask_handler))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        assert!(paths.contains(&"/ask".to_string()));
        assert!(paths.contains(&"/health".to_string()));
        assert!(paths.contains(&"/ready".to_string()));
    }
}
