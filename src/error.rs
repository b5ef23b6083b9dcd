use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Token-balance context attached to a 402 so the client can render an
/// upgrade prompt without a second round trip.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub error: String,
    pub plan: String,
    pub tokens_used: i64,
    pub tokens_total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_required: Option<i64>,
    pub upgrade_required: bool,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("quota exceeded")]
    QuotaExceeded(QuotaStatus),
    #[error("not found: {0}")]
    NotFound(String),
    /// A collaborator rejected the call; its status is passed through.
    #[error("upstream rejected: {1}")]
    UpstreamStatus(StatusCode, String),
    #[error("upstream error: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("{0}")]
    Message(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(?self);
        match self {
            AppError::QuotaExceeded(status) => {
                (StatusCode::PAYMENT_REQUIRED, Json(status)).into_response()
            }
            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            AppError::UpstreamStatus(status, msg) => error_body(status, msg),
            AppError::Upstream(e) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upstream service error: {e}"),
            ),
            AppError::Message(msg) => error_body(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub type AppResult<T> = Result<T, AppError>;
