//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use stakequiz_store::StoreError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Surfaced separately from other conflicts so clients can show a
    /// precise "already used" message instead of a generic failure.
    #[error("signature already used: {0}")]
    DuplicateSignature(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("quiz submissions are paused")]
    QuizPaused,

    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for RpcError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => RpcError::NotFound(what),
            StoreError::Duplicate(what) => RpcError::DuplicateSignature(what),
            StoreError::Conflict(what) => RpcError::Conflict(what),
            other => RpcError::Internal(other.to_string()),
        }
    }
}

impl From<stakequiz_queue::QueueError> for RpcError {
    fn from(e: stakequiz_queue::QueueError) -> Self {
        match e {
            stakequiz_queue::QueueError::InvalidJob(msg) => RpcError::InvalidRequest(msg),
            other => RpcError::QueueUnavailable(other.to_string()),
        }
    }
}

impl From<stakequiz_quiz::QuizError> for RpcError {
    fn from(e: stakequiz_quiz::QuizError) -> Self {
        RpcError::Internal(e.to_string())
    }
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateSignature(_) | Self::Conflict(_) | Self::QuizPaused => {
                StatusCode::CONFLICT
            }
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::QueueUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::DuplicateSignature(_) => "signature_already_used",
            Self::Conflict(_) => "conflict",
            Self::InvalidRequest(_) => "invalid_request",
            Self::QuizPaused => "quiz_paused",
            Self::QueueUnavailable(_) => "queue_unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "code": self.code(),
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
