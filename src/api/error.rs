//! HTTP error type and result alias.

use crate::error::PrintsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Handler result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    /// The file is mid-processing.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The stored document could not be processed.
    #[error("Unprocessable document: {0}")]
    Unprocessable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map error variant to HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_DOCUMENT"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// User-facing message. Server-side variants return a generic text; the
    /// full error is logged in `into_response`.
    fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Storage operation failed".to_string(),
            Self::Database(_) => "Database operation failed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::PayloadTooLarge(msg)
            | Self::Unprocessable(msg) => msg.clone(),
        }
    }
}

impl From<PrintsError> for AppError {
    fn from(err: PrintsError) -> Self {
        let msg = err.to_string();
        match err {
            PrintsError::FileNotFound { .. } | PrintsError::NotFound { .. } => Self::NotFound(msg),
            PrintsError::AlreadyProcessing { .. } => Self::Conflict(msg),
            PrintsError::Validation(m) => Self::Validation(m),
            PrintsError::Forbidden(m) => Self::Forbidden(m),
            PrintsError::PayloadTooLarge { .. } => Self::PayloadTooLarge(msg),
            PrintsError::NotAPdf { .. }
            | PrintsError::EmptyDocument { .. }
            | PrintsError::CorruptPdf { .. }
            | PrintsError::AllArtifactsFailed { .. } => Self::Unprocessable(msg),
            PrintsError::StorageFailed { .. } => Self::Storage(msg),
            PrintsError::DatabaseFailed { .. } => Self::Database(msg),
            PrintsError::PdfiumBindingFailed(_)
            | PrintsError::InvalidConfig(_)
            | PrintsError::Internal(_) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.user_message();

        if status.is_server_error() {
            tracing::error!(error = %self, code = code, "Request error");
        } else {
            tracing::debug!(error = %self, code = code, "Request rejected");
        }

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
