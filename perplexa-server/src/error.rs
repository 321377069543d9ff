//! HTTP error responses

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body of every error response: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors returned by the scoring endpoint
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Please provide a valid 'text' field with at least {min_chars} characters.")]
    InvalidText { min_chars: usize },

    /// The request body could not be read, e.g. it exceeds the size limit.
    #[error("{message}")]
    BodyRejected { status: StatusCode, message: String },

    /// Model loading or inference failed. The message is passed to the client as is.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Wrap a failure, keeping its full cause chain in the message.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(format!("{:#}", err.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidText { .. } => StatusCode::BAD_REQUEST,
            Self::BodyRejected { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::BodyRejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(message) => {
                tracing::error!("Exception occurred during processing: {}", message)
            }
            other => tracing::warn!("Rejected request: {}", other),
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
