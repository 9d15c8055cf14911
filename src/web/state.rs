use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{info, warn};

use crate::{config::AppConfig, llm::LlmClient, web::storage::UploadStore};

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    llm: LlmClient,
    uploads: UploadStore,
    cookie_key: Key,
    config: Arc<AppConfig>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("invalid DATABASE_URL `{}`", config.database_url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .context("failed to open SQLite database")?;

        Self::from_pool(pool, config).await
    }

    /// Finish wiring around an already-open pool: schema, upload directory, clients.
    pub async fn from_pool(pool: SqlitePool, config: AppConfig) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        let uploads = UploadStore::new(&config.upload_dir);
        uploads
            .ensure_root()
            .await
            .context("failed to prepare upload directory")?;

        if config.uses_dev_session_secret() {
            warn!("SESSION_SECRET is not set; using the development secret for session cookies");
        }
        warn!("admin registration is open to unauthenticated callers");
        info!(upload_dir = %config.upload_dir.display(), "storage ready");

        let llm = LlmClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_api_base.clone(),
        );
        if !llm.has_api_key() {
            warn!("GOOGLE_GEMINI_API_KEY is not set; chat and file summaries will return fallback replies");
        }

        Ok(Self {
            pool,
            llm,
            uploads,
            cookie_key: derive_cookie_key(&config.session_secret),
            config: Arc::new(config),
        })
    }

    pub fn llm_client(&self) -> LlmClient {
        self.llm.clone()
    }

    pub fn pool_ref(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Signing keys need 64 bytes; stretch whatever secret was configured.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
