//! Maps engine/validation failures onto HTTP responses.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::engine::EngineError;

/// The error type every HTTP handler in [`super`] returns.
#[derive(Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// Caller input failed validation: 400.
    Validation(String),
    /// Referenced resource does not exist: 404.
    NotFound,
    /// Resource state forbids the requested mutation: 400.
    StateConflict(String),
    /// An unexpected failure occurred: 500.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "{msg}"),
            ApiError::NotFound => write!(f, "not found"),
            ApiError::StateConflict(msg) => write!(f, "{msg}"),
            ApiError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::Validation(msg),
            EngineError::NotFound => ApiError::NotFound,
            EngineError::StateConflict(msg) => ApiError::StateConflict(msg),
            EngineError::Timeout => ApiError::Internal("command timed out while queued".to_string()),
            EngineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::StateConflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error reaching the API boundary");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
