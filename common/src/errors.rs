//! Error types shared by the engine and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error taxonomy.
///
/// `Connect`, `Query` and `RowParse` never cross a task boundary inside the
/// engine: they are turned into log entries by the task that hit them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// Establishing a session with a target failed (retried forever).
    #[error("connection to {target} failed: {message}")]
    Connect { target: String, message: String },

    /// The session-listing query failed; the current cycle is skipped.
    #[error("ps query failed on {target}: {message}")]
    Query { target: String, message: String },

    /// A single result row could not be decoded; the row is skipped.
    #[error("failed parsing of result row from {target}: {message}")]
    RowParse { target: String, message: String },

    /// The target file could not be read or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The engine has not published a view yet.
    #[error("view not ready: {0}")]
    NotReady(String),
}

impl AppError {
    /// Stable error code returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Connect { .. } => "CONNECT_FAILURE",
            AppError::Query { .. } => "QUERY_FAILURE",
            AppError::RowParse { .. } => "ROW_PARSE_FAILURE",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotReady(_) => "NOT_READY",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Connect { .. } | AppError::Query { .. } => StatusCode::BAD_GATEWAY,
            AppError::RowParse { .. } | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
