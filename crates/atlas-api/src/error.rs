//! Mapping from domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use atlas_core::error::LookupError;

/// Application-level error type that maps to structured HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No district, or the region is not covered by the current snapshot.
    #[error("not found: {0}")]
    NotFound(String),

    /// Surfaced for the upstream rate limiter's rejections.
    #[error("rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<LookupError> for AppError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::InvalidCoordinate { .. } => AppError::BadRequest(error.to_string()),
            LookupError::NotInAnyDistrict => AppError::NotFound("no district contains this point".to_string()),
            LookupError::DeadlineExceeded => AppError::Internal("lookup deadline exceeded".to_string()),
            LookupError::Proof(e) => AppError::Internal(e.to_string()),
        }
    }
}
