use std::{env, path::PathBuf};

use anyhow::{Context, Result, bail};
use axum::http::HeaderValue;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_URL: &str = "sqlite://quickiebot.db";
const DEFAULT_UPLOAD_DIR: &str = "static/uploads";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_UPLOAD_MB: usize = 32;
pub const DEV_SESSION_SECRET: &str = "quickiebot-dev-session-secret";

/// Runtime settings resolved once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub session_secret: String,
    pub debug: bool,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub cors_origin: HeaderValue,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got `{raw}`"))?,
            None => DEFAULT_PORT,
        };

        let max_upload_mb = match get("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_UPLOAD_MB must be a whole number, got `{raw}`"))?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };
        if max_upload_mb == 0 {
            bail!("MAX_UPLOAD_MB must be greater than zero");
        }

        let debug = match get("APP_DEBUG") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("APP_DEBUG must be true or false, got `{raw}`"))?,
            None => false,
        };

        let cors_origin_raw = get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        let cors_origin = HeaderValue::from_str(&cors_origin_raw)
            .with_context(|| format!("CORS_ORIGIN is not a valid origin: `{cors_origin_raw}`"))?;

        Ok(Self {
            gemini_api_key: get("GOOGLE_GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            session_secret: get("SESSION_SECRET").unwrap_or_else(|| DEV_SESSION_SECRET.to_string()),
            debug,
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            cors_origin,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }

    pub fn uses_dev_session_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("defaults");
        assert_eq!(config.port, 5000);
        assert_eq!(config.database_url, "sqlite://quickiebot.db");
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.cors_origin, "http://localhost:3000");
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.max_upload_bytes, 32 * 1024 * 1024);
        assert!(config.gemini_api_key.is_none());
        assert!(!config.debug);
        assert!(config.uses_dev_session_secret());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("APP_DEBUG", "TRUE"),
            ("SESSION_SECRET", "s3cr3t"),
            ("GOOGLE_GEMINI_API_KEY", "key-123"),
            ("UPLOAD_DIR", "/var/lib/quickiebot/uploads"),
            ("MAX_UPLOAD_MB", "4"),
        ])
        .expect("config");
        assert_eq!(config.port, 8081);
        assert!(config.debug);
        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.max_upload_bytes, 4 * 1024 * 1024);
        assert!(!config.uses_dev_session_secret());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("GOOGLE_GEMINI_API_KEY", "   "), ("PORT", "")]).expect("config");
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("PORT", "http")]).is_err());
        assert!(config_from(&[("APP_DEBUG", "maybe")]).is_err());
        assert!(config_from(&[("MAX_UPLOAD_MB", "0")]).is_err());
    }
}
