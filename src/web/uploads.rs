use std::collections::HashMap;

use axum::{body::Bytes, extract::Multipart};

/// Result type used by the shared upload helpers.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when a multipart body cannot be read.
#[derive(Debug)]
pub struct UploadError {
    message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadError {}

/// A file part held in memory until the whole form has been validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    /// Client-supplied name, unsanitized. Empty when the browser sent no file.
    pub original_name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn is_empty_selection(&self) -> bool {
        self.original_name.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub text_fields: HashMap<String, Vec<String>>,
}

impl UploadForm {
    pub fn files_for<'a>(&'a self, field_name: &str) -> impl Iterator<Item = &'a UploadedFile> {
        self.files
            .iter()
            .filter(move |file| file.field_name == field_name)
    }

    pub fn first_file_for(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files_for(field_name).next()
    }

    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_fields
            .get(field_name)
            .and_then(|values| values.first().map(|s| s.as_str()))
    }
}

/// Read every part of a multipart body. Nothing touches disk here, so callers can
/// reject a form before any side effect.
pub async fn read_upload_form(mut multipart: Multipart) -> UploadResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::new(format!("Failed to parse upload form: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|err| {
                UploadError::new(format!("Failed to read field `{field_name}`: {err}"))
            })?;
            form.text_fields.entry(field_name).or_default().push(value);
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|err| UploadError::new(format!("Failed to read upload data: {err}")))?;

        form.files.push(UploadedFile {
            field_name,
            original_name: file_name,
            bytes,
        });
    }

    Ok(form)
}
