use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::{
    llm::FileAttachment,
    utils::document_text::{DocumentKind, ExtractedContent},
    web::{
        AppError, AppState,
        responses::{ChatReply, reply_error},
        uploads::read_upload_form,
    },
};

const FILE_FIELD: &str = "file";
const CHAT_FALLBACK: &str = "Sorry, QuickieBot ran into an issue.";
const FILE_FALLBACK: &str = "Error processing the file with AI.";

type ChatResult = Result<Json<ChatReply>, (StatusCode, Json<ChatReply>)>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/file", post(chat_file))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatPayload {
    pub message: Option<String>,
}

async fn chat(State(state): State<AppState>, payload: Option<Json<ChatPayload>>) -> ChatResult {
    let message = payload
        .and_then(|Json(payload)| payload.message)
        .unwrap_or_default();
    if message.trim().is_empty() {
        return Err(AppError::validation("Please enter a valid message.")
            .into_chat_reply(CHAT_FALLBACK));
    }

    state
        .llm_client()
        .complete_text(&message)
        .await
        .map(|reply| Json(ChatReply::new(reply)))
        .map_err(|err| AppError::ExternalService(err).into_chat_reply(CHAT_FALLBACK))
}

async fn chat_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ChatResult {
    let Ok(multipart) = multipart else {
        return Err(reply_error(StatusCode::BAD_REQUEST, "No file uploaded."));
    };
    let form = read_upload_form(multipart).await.map_err(|err| {
        warn!(error = %err, "failed to read chat upload");
        reply_error(StatusCode::BAD_REQUEST, "No file uploaded.")
    })?;

    let Some(upload) = form
        .first_file_for(FILE_FIELD)
        .filter(|file| !file.is_empty_selection())
    else {
        return Err(reply_error(StatusCode::BAD_REQUEST, "No file uploaded."));
    };

    let Some(kind) = DocumentKind::from_filename(&upload.original_name) else {
        return Err(reply_error(
            StatusCode::BAD_REQUEST,
            "File type not allowed.",
        ));
    };

    let filename = upload.original_name.clone();
    let bytes = upload.bytes.clone();
    let extracted = tokio::task::spawn_blocking(move || kind.extract(&filename, &bytes))
        .await
        .map_err(|err| {
            error!(?err, "file extraction task panicked");
            reply_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading file: extraction task failed",
            )
        })?
        .map_err(|err| {
            error!(?err, file = %upload.original_name, "failed to read uploaded file");
            reply_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error reading file: {err}"),
            )
        })?;

    let llm = state.llm_client();
    let outcome = match extracted {
        ExtractedContent::Image(image) => {
            llm.describe_image(FileAttachment::new(
                image.label,
                image.mime_type,
                image.base64_data,
            ))
            .await
        }
        ExtractedContent::Text(text) => llm.summarize(&text).await,
    };

    outcome
        .map(|reply| Json(ChatReply::new(reply)))
        .map_err(|err| {
            let err = err.context(format!("processing upload {}", upload.original_name));
            AppError::ExternalService(err).into_chat_reply(FILE_FALLBACK)
        })
}
