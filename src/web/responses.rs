use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// `{"message": ...}` body for successful mutations.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub message: String,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{"error": ...}` body for rejected requests.
#[derive(Debug, Serialize, Clone)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Chat endpoints answer with `{"reply": ...}` whether they succeed or not.
#[derive(Debug, Serialize, Clone)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

/// Helper for chat handlers that need to return `(StatusCode, Json<ChatReply>)`.
pub fn reply_error(status: StatusCode, reply: impl Into<String>) -> (StatusCode, Json<ChatReply>) {
    (status, Json(ChatReply::new(reply)))
}
