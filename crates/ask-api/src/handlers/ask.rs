//! Question answering handler
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use ask_core::{AskQuery, ContextRow};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Ask request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    /// User's question
    #[schema(example = "What is X?")]
    pub question: String,

    /// Maximum number of context rows to retrieve
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 5, default = 5, minimum = 1)]
    pub top_k: Option<u64>,
}

/// One supporting snippet in an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContextItem {
    /// Source document identifier
    #[schema(example = "doc1.txt")]
    pub source: String,

    /// Modality tag
    #[schema(example = "text")]
    pub modality: String,

    /// Retrieved text
    #[schema(example = "X is Y because...")]
    pub chunk: String,

    /// Relevance score
    #[schema(example = 0.92)]
    pub score: f64,
}

impl From<ContextRow> for ContextItem {
    fn from(row: ContextRow) -> Self {
        Self {
            source: row.source,
            modality: row.modality,
            chunk: row.chunk,
            score: row.score,
        }
    }
}

/// Ask response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    /// Generated answer
    #[schema(example = "X is Y.")]
    pub answer: String,

    /// Supporting context, in retrieval order
    pub context: Vec<ContextItem>,
}

/// Validated `/ask` body
///
/// The body is read as raw bytes so that every malformed input gets the
/// same `{"error": ...}` shape instead of axum's plain-text rejections.
#[derive(Debug, Clone, PartialEq)]
pub struct AskPayload {
    pub question: String,
    pub top_k: Option<u64>,
}

impl AskPayload {
    /// Validate a decoded JSON body
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let Value::Object(mut body) = value else {
            return Err(AppError::missing_question());
        };

        let question = match body.remove("question") {
            None => return Err(AppError::missing_question()),
            Some(Value::String(q)) if q.trim().is_empty() => {
                return Err(AppError::BadRequest(
                    "'question' must not be empty".to_string(),
                ))
            }
            Some(Value::String(q)) => q,
            Some(_) => {
                return Err(AppError::BadRequest(
                    "'question' must be a string".to_string(),
                ))
            }
        };

        let top_k = match body.remove("top_k") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(k) if k > 0 => Some(k),
                _ => {
                    return Err(AppError::BadRequest(
                        "'top_k' must be a positive integer".to_string(),
                    ))
                }
            },
        };

        Ok(Self { question, top_k })
    }
}

#[async_trait]
impl<S> FromRequest<S> for AskPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(rejection.body_text())
            } else {
                AppError::missing_question()
            }
        })?;

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|_| AppError::missing_question())?;

        Self::from_value(value)
    }
}

/// Answer a question with supporting context
#[utoipa::path(
    post,
    path = "/ask",
    tag = "ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponse),
        (status = 400, description = "Missing or invalid question", body = crate::error::ApiError),
        (status = 404, description = "Answer engine has nothing to answer from", body = crate::error::ApiError),
        (status = 500, description = "Answer engine failed", body = crate::error::ApiError),
        (status = 503, description = "Answer engine unreachable", body = crate::error::ApiError),
        (status = 504, description = "Answer engine timed out", body = crate::error::ApiError)
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    payload: AskPayload,
) -> Result<Json<AskResponse>, AppError> {
    let server = &state.config.server;
    let top_k = payload.top_k.unwrap_or(server.default_top_k as u64);
    if top_k > server.max_top_k as u64 {
        return Err(AppError::BadRequest(format!(
            "'top_k' must not exceed {}",
            server.max_top_k
        )));
    }
    let query = AskQuery::new(payload.question).with_top_k(top_k as usize);

    tracing::debug!(
        top_k = query.top_k,
        engine = state.engine.name(),
        "Ask request received"
    );
    state.record_ask();
    let start = Instant::now();

    let answer = match state.engine.answer(&query.question, query.top_k).await {
        Ok(answer) => answer,
        Err(err) => {
            state.record_ask_failure();
            tracing::warn!(kind = err.kind(), error = err.message(), "Answer engine failed");
            return Err(err.into());
        }
    };

    tracing::info!(
        rows = answer.rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Answer generated"
    );

    Ok(Json(AskResponse {
        answer: answer.text,
        context: answer.rows.into_iter().map(ContextItem::from).collect(),
    }))
}
