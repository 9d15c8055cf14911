use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::web::responses::{ApiError, ChatReply, reply_error};

/// Failures surfaced by the JSON endpoints, rendered as `{"error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// A unique field is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    /// The AI gateway or a document parser failed.
    #[error("external service failure: {0:#}")]
    ExternalService(anyhow::Error),

    /// Hashing a new password failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExternalService(_)
            | AppError::PasswordHash(_)
            | AppError::Io(_)
            | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Render for the chat endpoints, which always answer `{"reply": ...}`. Server-side
    /// failures are logged and replaced by `fallback`.
    pub fn into_chat_reply(self, fallback: &str) -> (StatusCode, Json<ChatReply>) {
        let status = self.status();
        if status.is_server_error() {
            error!(err = %self, "chat request failed");
            reply_error(status, fallback)
        } else {
            reply_error(status, self.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(err = %self, "request failed");
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiError::new(message))).into_response()
    }
}
