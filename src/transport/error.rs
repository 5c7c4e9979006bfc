use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{PulseError, ValidationError};

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed or incomplete. The message is shown to the
    /// client as is.
    #[error("{0}")]
    BadRequest(String),

    /// Anything else. The detail is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<PulseError> for ApiError {
    fn from(err: PulseError) -> Self {
        match err {
            PulseError::Validation(ValidationError::MissingField { field }) => {
                Self::BadRequest(format!("No {field} provided"))
            }
            err if err.is_client_error() => Self::BadRequest(err.to_string()),
            err => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
