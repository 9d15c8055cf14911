use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    modules,
    web::{AppState, accounts, admin},
};

pub fn build_router(state: AppState) -> Router {
    let config = state.config();
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/user/register", post(accounts::register_user))
        .route("/user/login", post(accounts::login_user))
        .route("/user/logout", post(accounts::logout))
        .route("/admin", get(admin::dashboard))
        .route(
            "/admin/register",
            get(admin::register_page).post(accounts::register_admin),
        )
        .route(
            "/admin/login",
            get(admin::login_page).post(accounts::login_admin),
        )
        .route("/admin/logout", post(accounts::logout))
        .merge(modules::chat::router())
        .merge(modules::resources::router())
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "Backend running"
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
