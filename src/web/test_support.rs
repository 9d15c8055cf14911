//! Router harness shared by handler tests: in-memory SQLite and a scratch upload directory.
//! `TestApp::new` has no Gemini key, so AI calls take the fallback path; `with_gemini`
//! points the client at a local `GeminiStub`.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::Response,
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::{
    config::AppConfig,
    web::{AppState, auth::SESSION_COOKIE, router::build_router},
};

const BOUNDARY: &str = "quickiebot-test-boundary";

pub enum MultipartPart<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Harness whose AI client talks to `stub` instead of the real endpoint.
    pub async fn with_gemini(stub: &GeminiStub) -> Self {
        Self::with_env(&[
            ("GOOGLE_GEMINI_API_KEY", GeminiStub::API_KEY),
            ("GEMINI_API_BASE", stub.base_url()),
        ])
        .await
    }

    async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let uploads = tempfile::tempdir().expect("temp dir");
        let upload_dir = uploads.path().to_string_lossy().to_string();
        let config = AppConfig::from_lookup(|key| {
            if let Some((_, value)) = overrides.iter().find(|(name, _)| *name == key) {
                return Some(value.to_string());
            }
            match key {
                "UPLOAD_DIR" => Some(upload_dir.clone()),
                "SESSION_SECRET" => Some("test-session-secret".to_string()),
                _ => None,
            }
        })
        .expect("config");

        // A single connection that never recycles keeps the in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        let state = AppState::from_pool(pool, config).await.expect("state");
        Self {
            router: build_router(state.clone()),
            state,
            uploads,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn upload_dir(&self) -> &Path {
        self.uploads.path()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        json: Option<Value>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: &Value,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self
            .request(Method::POST, uri, Some(body.clone()), cookie)
            .await;
        let status = response.status();
        (status, Self::json_body(response).await)
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        parts: &[MultipartPart<'_>],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(encode_multipart(parts)))
            .expect("request");
        let response = self.send(request).await;
        let status = response.status();
        (status, Self::json_body(response).await)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = Self::body_bytes(response).await;
        serde_json::from_slice(&bytes).expect("json body")
    }

    pub async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    /// The `name=value` pair of a freshly issued session cookie.
    pub fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .find(|pair| {
                pair.strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .is_some_and(|value| !value.is_empty())
            })
            .map(str::to_string)
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.state.pool_ref())
            .await
            .expect("count sessions")
    }
}

/// One `generateContent` call as the stub received it.
#[derive(Clone, Debug)]
pub struct CapturedCall {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

/// Local stand-in for the Gemini REST API. Answers every request with a fixed reply
/// and records what was sent.
pub struct GeminiStub {
    base_url: String,
    calls: Arc<Mutex<Vec<CapturedCall>>>,
}

impl GeminiStub {
    pub const API_KEY: &'static str = "stub-api-key";

    pub async fn start(reply: &'static str) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .fallback(
                move |State(calls): State<Arc<Mutex<Vec<CapturedCall>>>>,
                      uri: Uri,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    calls.lock().expect("calls lock").push(CapturedCall {
                        path: uri.path().to_string(),
                        api_key: headers
                            .get("x-goog-api-key")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string),
                        body,
                    });
                    Json(json!({
                        "candidates": [{
                            "content": { "role": "model", "parts": [{ "text": reply }] }
                        }],
                        "usageMetadata": { "promptTokenCount": 3, "totalTokenCount": 5 }
                    }))
                },
            )
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub server");
        });

        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

fn encode_multipart(parts: &[MultipartPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            MultipartPart::File {
                name,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            MultipartPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
