//! Remote answer engine
//!
//! Talks to the retrieval-augmented generation service over HTTP and maps
//! its failures onto [`EngineError`] kinds.
//!
//! Author: hephaex@gmail.com

use ask_core::{Answer, AnswerEngine, ContextRow, EngineConfig, EngineError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client for an answer service
pub struct RemoteAnswerEngine {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    question: &'a str,
    k: usize,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    answer: String,
    #[serde(default)]
    rows: Vec<ContextRow>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl RemoteAnswerEngine {
    /// Create a new remote engine
    pub fn new(
        base_url: impl AsRef<str>,
        answer_path: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: join_url(base_url.as_ref(), answer_path.as_ref()),
            api_key: None,
        })
    }

    /// Create from config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let engine = Self::new(
            &config.base_url,
            &config.answer_path,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(match &config.api_key {
            Some(key) => engine.with_api_key(key.clone()),
            None => engine,
        })
    }

    /// Send a bearer token with every request
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Full URL of the answer operation
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerEngine for RemoteAnswerEngine {
    async fn answer(&self, question: &str, k: usize) -> Result<Answer> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&AnswerRequest { question, k });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: AnswerResponse = serde_json::from_slice(&body).map_err(|e| {
            EngineError::Internal(format!("Failed to parse answer engine response: {e}"))
        })?;

        tracing::debug!(
            rows = parsed.rows.len(),
            "Answer engine returned {} chars",
            parsed.answer.len()
        );

        Ok(Answer::new(parsed.answer, parsed.rows))
    }

    fn name(&self) -> &str {
        "remote"
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Classify a failure that happened before a status line was available
fn transport_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout(format!("Answer engine timed out: {err}"))
    } else if err.is_connect() {
        EngineError::Unavailable(format!("Answer engine unreachable: {err}"))
    } else {
        EngineError::Internal(format!("Answer engine request failed: {err}"))
    }
}

/// Classify a non-2xx answer
fn status_error(status: StatusCode, body: &[u8]) -> EngineError {
    let message = serde_json::from_slice::<ErrorResponse>(body)
        .map(|e| e.error)
        .ok()
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| format!("Answer engine returned {status}"));

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            EngineError::InvalidInput(message)
        }
        StatusCode::NOT_FOUND => EngineError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => EngineError::Timeout(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            EngineError::Unavailable(message)
        }
        _ => EngineError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, response::IntoResponse, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn stub_answer(headers: HeaderMap, Json(req): Json<Value>) -> axum::response::Response {
        let question = req["question"].as_str().unwrap_or_default().to_string();
        let k = req["k"].as_u64().unwrap_or_default();

        match question.as_str() {
            "boom" => (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "index unavailable" })),
            )
                .into_response(),
            "missing" => (axum::http::StatusCode::NOT_FOUND, "no such collection").into_response(),
            "busy" => axum::http::StatusCode::SERVICE_UNAVAILABLE.into_response(),
            "garbage" => (axum::http::StatusCode::OK, "not json").into_response(),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "answer": "late", "rows": [] })).into_response()
            }
            "whoami" => {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                Json(json!({ "answer": auth, "rows": [] })).into_response()
            }
            _ => Json(json!({
                "answer": format!("{question} (k={k})"),
                "rows": [
                    ["doc1.txt", "X is Y because...", "text", 0.92],
                    ["fig2.png", "caption", "image", 0.5]
                ]
            }))
            .into_response(),
        }
    }

    async fn spawn_stub() -> String {
        let app = Router::new().route("/answer", post(stub_answer));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn engine(base_url: &str) -> RemoteAnswerEngine {
        RemoteAnswerEngine::new(base_url, "/answer", Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:8000/", "/answer"), "http://h:8000/answer");
        assert_eq!(join_url("http://h:8000", "answer"), "http://h:8000/answer");
        assert_eq!(join_url("http://h:8000/ask", ""), "http://h:8000/ask");
    }

    #[test]
    fn test_status_error_mapping() {
        let err = status_error(StatusCode::BAD_REQUEST, br#"{"error": "k too large"}"#);
        assert_eq!(err, EngineError::InvalidInput("k too large".to_string()));

        let err = status_error(StatusCode::GATEWAY_TIMEOUT, b"");
        assert!(matches!(err, EngineError::Timeout(_)));

        let err = status_error(StatusCode::IM_A_TEAPOT, b"  short and stout ");
        assert_eq!(err, EngineError::Internal("short and stout".to_string()));
    }

    #[tokio::test]
    async fn test_rows_pass_through_in_order() {
        let base = spawn_stub().await;
        let answer = engine(&base).answer("What is X?", 3).await.unwrap();

        assert_eq!(answer.text, "What is X? (k=3)");
        assert_eq!(answer.rows.len(), 2);
        assert_eq!(
            answer.rows[0],
            ContextRow::new("doc1.txt", "X is Y because...", "text", 0.92)
        );
        assert_eq!(answer.rows[1].modality, "image");
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_kept() {
        let base = spawn_stub().await;
        let err = engine(&base).answer("boom", 5).await.unwrap_err();

        assert_eq!(err, EngineError::Internal("index unavailable".to_string()));
    }

    #[tokio::test]
    async fn test_upstream_statuses_are_classified() {
        let base = spawn_stub().await;
        let engine = engine(&base);

        assert_eq!(
            engine.answer("missing", 5).await.unwrap_err(),
            EngineError::NotFound("no such collection".to_string())
        );
        assert!(matches!(
            engine.answer("busy", 5).await.unwrap_err(),
            EngineError::Unavailable(_)
        ));
        assert!(matches!(
            engine.answer("garbage", 5).await.unwrap_err(),
            EngineError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let base = spawn_stub().await;
        let err = engine(&base).answer("slow", 5).await.unwrap_err();

        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = engine(&format!("http://{addr}"))
            .answer("anything", 5)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "unavailable");
    }

    #[tokio::test]
    async fn test_api_key_is_sent_as_bearer() {
        let base = spawn_stub().await;
        let config = EngineConfig {
            base_url: base,
            api_key: Some("s3cret".to_string()),
            ..Default::default()
        };

        let answer = RemoteAnswerEngine::from_config(&config)
            .unwrap()
            .answer("whoami", 1)
            .await
            .unwrap();

        assert_eq!(answer.text, "Bearer s3cret");
    }
}
