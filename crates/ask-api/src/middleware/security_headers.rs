//! Security headers middleware
//!
//! The gateway only serves JSON, so the header set is the API subset:
//! - X-Content-Type-Options: nosniff
//! - X-Frame-Options: DENY
//! - Referrer-Policy: no-referrer
//! - Cache-Control: no-store (answers may quote restricted documents)
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Adds the API security headers to every response
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    // Handlers that set their own caching policy keep it
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{Request, StatusCode},
        middleware,
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        async fn ok_handler() -> impl IntoResponse {
            (StatusCode::OK, "ok")
        }

        async fn cached_handler() -> impl IntoResponse {
            ([(header::CACHE_CONTROL, "max-age=60")], "cached")
        }

        async fn error_handler() -> impl IntoResponse {
            (StatusCode::INTERNAL_SERVER_ERROR, "error")
        }

        Router::new()
            .route("/ok", get(ok_handler))
            .route("/cached", get(cached_handler))
            .route("/error", get(error_handler))
            .layer(middleware::from_fn(security_headers_middleware))
    }

    async fn get_path(path: &str) -> Response {
        app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let response = get_path("/ok").await;
        let headers = response.headers();

        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    }

    #[tokio::test]
    async fn test_existing_cache_control_is_kept() {
        let response = get_path("/cached").await;
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "max-age=60"
        );
    }

    #[tokio::test]
    async fn test_security_headers_on_error_response() {
        let response = get_path("/error").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::X_CONTENT_TYPE_OPTIONS).is_some());
    }
}
