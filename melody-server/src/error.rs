//! Error types for melody-server
//!
//! Every handler returns [`ApiResult`]; failures are turned into JSON
//! responses at the request boundary.

use crate::validation::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Field validation failed (422)
    #[error("Validation failed: {}", .0.summary())]
    Validation(ValidationErrors),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body over the upload limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upstream audio source could not be reached (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Upstream audio source answered with a failure status
    #[error("Upstream responded with status {0}")]
    UpstreamStatus(u16),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// melody-common error
    #[error("Common error: {0}")]
    Common(#[from] melody_common::Error),
}

impl ApiError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Common(melody_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(melody_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::BadGateway(_) | ApiError::UpstreamStatus(_) => "UPSTREAM_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Io(_) => "IO_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            ApiError::Validation(errors) => json!({
                "message": errors.summary(),
                "code": code,
                "errors": errors.fields(),
            }),
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::BadGateway(msg)
            | ApiError::Common(melody_common::Error::NotFound(msg))
            | ApiError::Common(melody_common::Error::InvalidInput(msg)) => json!({
                "message": msg,
                "code": code,
            }),
            ApiError::UpstreamStatus(_) => json!({
                "message": "Unable to load the audio source.",
                "code": code,
            }),
            other => {
                error!("Request failed: {}", other);
                json!({
                    "message": "Server error.",
                    "code": code,
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
