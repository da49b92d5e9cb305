//! Unified error handling for the server.
//!
//! Only transport-level failures live here. A missing record is a normal
//! rule response and never reaches this type.

use crate::body::BodyError;
use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request. {0}")]
    Body(#[from] BodyError),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Cannot {method} {path}")]
    NoRoute { method: Method, path: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Body(e) => {
                tracing::warn!("Rejected request body: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain")],
                    self.to_string(),
                )
                    .into_response()
            }
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
            AppError::NoRoute { .. } => (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain")],
                self.to_string(),
            )
                .into_response(),
        }
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
