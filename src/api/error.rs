//! HTTP error responses.
//!
//! Client errors carry the core error message. Server-side failures are
//! logged with their cause and answered with a generic message.
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Status code plus JSON body, returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
                request_id: None,
            },
        }
    }

    pub fn with_request_id(mut self, ctx: &RequestContext) -> Self {
        self.body.request_id = Some(ctx.request_id.clone());
        self
    }

    /// Maps a core error; `not_found` is the status used for
    /// [`Error::NotFound`], which differs between reads and writes.
    pub fn from_core(err: Error, ctx: &RequestContext, not_found: StatusCode) -> Self {
        let error = match err {
            Error::Validation(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
            }
            Error::NotFound(message) => ApiError::new(not_found, "not_found", message),
            Error::Conflict(message) => ApiError::new(StatusCode::BAD_REQUEST, "conflict", message),
            Error::Timeout { message } => {
                tracing::error!(request_id = %ctx.request_id, "request timed out: {}", message);
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "database timed out")
            }
            other => {
                tracing::error!(request_id = %ctx.request_id, error = ?other, "request failed");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error while talking to the database",
                )
            }
        };
        error.with_request_id(ctx)
    }
}

pub fn api_validation_error(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn api_unauthorized(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}
