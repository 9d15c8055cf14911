use std::{io, path::Path};

use axum::{
    Json, Router,
    extract::{Multipart, Path as AxumPath, State, multipart::MultipartRejection},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
};
use tracing::{info, warn};

use crate::{
    utils::document_text::is_allowed_file,
    web::{
        AppError, AppState,
        data,
        models::{ResourceRow, ResourceSummary},
        responses::ApiMessage,
        storage::{inline_file_headers, sanitize_upload_name},
        uploads::{UploadForm, UploadedFile, read_upload_form},
    },
};

const FILE_FIELD: &str = "file";
const THUMBNAIL_FIELD: &str = "thumbnail";
const DESCRIPTION_FIELD: &str = "description";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/resources", get(list_resources).post(create_resource))
        .route(
            "/api/resources/:id",
            put(update_resource).delete(delete_resource),
        )
        .route("/uploads/:filename", get(serve_upload))
}

async fn list_resources(State(state): State<AppState>) -> Result<Json<Vec<ResourceRow>>, AppError> {
    let resources = data::fetch_resources(state.pool_ref()).await?;
    Ok(Json(resources))
}

async fn create_resource(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ResourceRow>), AppError> {
    let Ok(multipart) = multipart else {
        return Err(AppError::validation("No file part"));
    };
    let form = read_form(multipart).await?;

    let Some(file) = form.first_file_for(FILE_FIELD) else {
        return Err(AppError::validation("No file part"));
    };
    if file.is_empty_selection() {
        return Err(AppError::validation("No selected file"));
    }
    if !is_allowed_file(&file.original_name) {
        return Err(AppError::validation("File type not allowed"));
    }
    let Some(stored_name) = sanitize_upload_name(&file.original_name) else {
        return Err(AppError::validation("No selected file"));
    };

    let thumbnail = form
        .first_file_for(THUMBNAIL_FIELD)
        .filter(|thumb| !thumb.is_empty_selection())
        .and_then(|thumb| sanitize_upload_name(&thumb.original_name).map(|name| (name, thumb)));
    let description = form.first_text(DESCRIPTION_FIELD).unwrap_or_default();

    let uploads = state.uploads();
    let filepath = uploads.save(&stored_name, &file.bytes).await?;
    if let Some((thumb_name, thumb)) = &thumbnail {
        uploads.save(thumb_name, &thumb.bytes).await?;
    }

    let resource = data::insert_resource(
        state.pool_ref(),
        &stored_name,
        description,
        &filepath.to_string_lossy(),
        thumbnail.as_ref().map(|(name, _)| name.as_str()),
    )
    .await?;

    info!(id = resource.id, filename = %resource.filename, "resource uploaded");
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResourceSummary>, AppError> {
    let Some(mut resource) = data::fetch_resource(state.pool_ref(), id).await? else {
        return Err(resource_not_found());
    };

    // A body that is not multipart carries no changes.
    let form = match multipart {
        Ok(multipart) => read_form(multipart).await?,
        Err(_) => UploadForm::default(),
    };

    let replacement = form
        .first_file_for(FILE_FIELD)
        .filter(|file| !file.is_empty_selection())
        .and_then(replacement_name);

    if let Some(description) = form.first_text(DESCRIPTION_FIELD) {
        resource.description = Some(description.to_string());
    }

    if let Some((stored_name, file)) = replacement {
        let uploads = state.uploads();
        let new_path = uploads.save(&stored_name, &file.bytes).await?;
        let old_path = Path::new(&resource.filepath);
        if old_path != new_path {
            uploads.remove_best_effort(old_path).await;
        }
        resource.filename = stored_name;
        resource.filepath = new_path.to_string_lossy().into_owned();
    }

    data::save_resource(state.pool_ref(), &resource).await?;
    info!(id, filename = %resource.filename, "resource updated");
    Ok(Json(resource.into()))
}

async fn delete_resource(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<ApiMessage>, AppError> {
    let Some(resource) = data::fetch_resource(state.pool_ref(), id).await? else {
        return Err(resource_not_found());
    };

    let uploads = state.uploads();
    uploads
        .remove_best_effort(Path::new(&resource.filepath))
        .await;
    if let Some(thumbnail) = resource.thumbnail.as_deref() {
        uploads.remove_best_effort(&uploads.path_for(thumbnail)).await;
    }

    data::delete_resource(state.pool_ref(), id).await?;
    info!(id, filename = %resource.filename, "resource deleted");
    Ok(Json(ApiMessage::new("Resource deleted")))
}

async fn serve_upload(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<(HeaderMap, Vec<u8>), AppError> {
    match state.uploads().read(&filename).await {
        Ok(bytes) => Ok((inline_file_headers(&filename), bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(AppError::not_found("File not found"))
        }
        Err(err) => Err(err.into()),
    }
}

async fn read_form(multipart: Multipart) -> Result<UploadForm, AppError> {
    read_upload_form(multipart)
        .await
        .map_err(|err| AppError::validation(err.message()))
}

/// Stored name for a replacement file. Uploads that cannot be stored are skipped so the
/// rest of the update still applies.
fn replacement_name(file: &UploadedFile) -> Option<(String, &UploadedFile)> {
    if !is_allowed_file(&file.original_name) {
        warn!(file = %file.original_name, "ignoring replacement with disallowed file type");
        return None;
    }
    let Some(name) = sanitize_upload_name(&file.original_name) else {
        warn!(file = %file.original_name, "ignoring replacement with unusable file name");
        return None;
    };
    Some((name, file))
}

fn resource_not_found() -> AppError {
    AppError::not_found("Resource not found")
}
