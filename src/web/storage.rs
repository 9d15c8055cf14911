use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use axum::http::{HeaderMap, HeaderValue, header};
use tracing::warn;

/// Flat directory holding every uploaded resource file and thumbnail.
#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to ensure upload root at {}", self.root.display()))
    }

    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Write `bytes` under `stored_name`, replacing any file of the same name.
    pub async fn save(&self, stored_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(stored_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove a stored file. Failures are logged and otherwise ignored.
    pub async fn remove_best_effort(&self, path: &Path) {
        if let Err(err) = tokio::fs::remove_file(path).await {
            warn!(?err, file = %path.display(), "failed to remove stored upload");
        }
    }

    /// Read a stored file by its bare name. Names that would leave the directory are
    /// reported as missing.
    pub async fn read(&self, requested_name: &str) -> io::Result<Vec<u8>> {
        match sanitize_upload_name(requested_name) {
            Some(name) if name == requested_name => tokio::fs::read(self.path_for(&name)).await,
            _ => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

/// Strip path separators and reserved names from a client filename. `None` when
/// nothing usable is left.
pub fn sanitize_upload_name(original: &str) -> Option<String> {
    let sanitized = sanitize_filename::sanitize(original);
    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Headers for serving a stored file inline. Text gets an explicit UTF-8 charset.
pub fn inline_file_headers(filename: &str) -> HeaderMap {
    let guessed = mime_guess::from_path(filename).first_or_octet_stream();
    let content_type = if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none()
    {
        format!("{guessed}; charset=utf-8")
    } else {
        guessed.to_string()
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers
}
