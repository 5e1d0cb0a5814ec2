//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod metrics;
pub mod security_headers;

pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;

use ask_core::ServerConfig;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer, or `None` when CORS is disabled
pub fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_origins.is_empty() {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(layer.allow_origin(AllowOrigin::list(origins)))
}
