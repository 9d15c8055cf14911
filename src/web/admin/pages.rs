use axum::response::Html;

use crate::web::templates::{AuthForm, render_auth_page};

pub async fn login_page() -> Html<String> {
    Html(render_auth_page(AuthForm::Login))
}

pub async fn register_page() -> Html<String> {
    Html(render_auth_page(AuthForm::Register))
}
