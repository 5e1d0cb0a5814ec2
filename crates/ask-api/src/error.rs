//! API error handling
//!
//! Every failure leaves the gateway as `{"error": "<message>"}` with the
//! status that matches its kind.
//!
//! Author: hephaex@gmail.com

use ask_core::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message returned when the body carries no usable `question`
pub const MISSING_QUESTION: &str = "Veuillez fournir la clé 'question'";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    #[schema(example = "index unavailable")]
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// The fixed rejection for bodies without a usable `question`
    pub fn missing_question() -> Self {
        Self::BadRequest(MISSING_QUESTION.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ApiError::new(self.to_string()))).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => AppError::BadRequest(msg),
            EngineError::NotFound(msg) => AppError::NotFound(msg),
            EngineError::Timeout(msg) => AppError::GatewayTimeout(msg),
            EngineError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            EngineError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
