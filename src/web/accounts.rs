use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use tracing::info;

use crate::web::{
    AppState,
    auth::{self, SessionIdentity},
    data::{self, AccountColumn},
    error::AppError,
    models::AccountKind,
    responses::ApiMessage,
};

#[derive(Debug, Default, Deserialize)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn register_user(
    State(state): State<AppState>,
    payload: Option<Json<RegisterPayload>>,
) -> Result<(StatusCode, Json<ApiMessage>), AppError> {
    register(&state, AccountKind::User, unwrap_payload(payload)).await
}

pub async fn register_admin(
    State(state): State<AppState>,
    payload: Option<Json<RegisterPayload>>,
) -> Result<(StatusCode, Json<ApiMessage>), AppError> {
    register(&state, AccountKind::Admin, unwrap_payload(payload)).await
}

pub async fn login_user(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    payload: Option<Json<LoginPayload>>,
) -> Result<(SignedCookieJar, Json<ApiMessage>), AppError> {
    login(&state, jar, AccountKind::User, unwrap_payload(payload)).await
}

pub async fn login_admin(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    payload: Option<Json<LoginPayload>>,
) -> Result<(SignedCookieJar, Json<ApiMessage>), AppError> {
    login(&state, jar, AccountKind::Admin, unwrap_payload(payload)).await
}

/// Both logout routes clear the entire session.
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<ApiMessage>) {
    if let Ok(Some(session)) = auth::load_session(state.pool_ref(), &jar).await {
        info!(
            user = ?session.user().map(|(_, name)| name),
            admin = ?session.admin().map(|(_, name)| name),
            "session closed"
        );
    }
    let jar = auth::clear_session(state.pool_ref(), jar).await;
    (jar, Json(ApiMessage::new("Logged out successfully.")))
}

/// A body that is missing or not JSON is read as an empty object.
fn unwrap_payload<T: Default>(payload: Option<Json<T>>) -> T {
    payload.map(|Json(inner)| inner).unwrap_or_default()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

async fn register(
    state: &AppState,
    kind: AccountKind,
    payload: RegisterPayload,
) -> Result<(StatusCode, Json<ApiMessage>), AppError> {
    let (Some(username), Some(email), Some(password)) = (
        required(payload.username),
        required(payload.email),
        required(payload.password),
    ) else {
        return Err(AppError::validation("All fields are required."));
    };

    let pool = state.pool_ref();
    if data::account_field_taken(pool, kind, AccountColumn::Username, &username).await? {
        return Err(AppError::Conflict("Username already exists.".into()));
    }
    if data::account_field_taken(pool, kind, AccountColumn::Email, &email).await? {
        return Err(AppError::Conflict("Email already registered.".into()));
    }

    let password_hash =
        auth::hash_password(&password).map_err(|err| AppError::PasswordHash(err.to_string()))?;

    match data::insert_account(pool, kind, &username, &email, &password_hash).await {
        Ok(id) => {
            info!(id, username = %username, kind = kind.label(), "account registered");
            Ok((
                StatusCode::CREATED,
                Json(ApiMessage::new(format!(
                    "{} registered successfully!",
                    kind.label()
                ))),
            ))
        }
        // Lost a race with a concurrent registration for the same name or email.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            AppError::Conflict("Username or email already registered.".into()),
        ),
        Err(err) => Err(err.into()),
    }
}

async fn login(
    state: &AppState,
    jar: SignedCookieJar,
    kind: AccountKind,
    payload: LoginPayload,
) -> Result<(SignedCookieJar, Json<ApiMessage>), AppError> {
    let invalid = || AppError::Auth("Invalid username or password.".into());

    let (Some(username), Some(password)) = (payload.username, payload.password) else {
        return Err(invalid());
    };

    let Some(account) = data::fetch_account_by_username(state.pool_ref(), kind, &username).await?
    else {
        return Err(invalid());
    };

    if !auth::verify_password(&password, &account.password) {
        return Err(invalid());
    }

    let identity = SessionIdentity {
        kind,
        id: account.id,
        username: account.username,
    };
    let jar = auth::bind_identity(state.pool_ref(), jar, &identity).await?;

    Ok((
        jar,
        Json(ApiMessage::new(format!("Welcome, {}!", identity.username))),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, header};
    use serde_json::json;

    use crate::web::test_support::TestApp;

    #[tokio::test]
    async fn user_registration_rejects_duplicates() {
        let app = TestApp::new().await;
        let body = json!({"username": "ada", "email": "ada@x.com", "password": "secret"});

        let (status, payload) = app.post_json("/user/register", &body, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload, json!({"message": "User registered successfully!"}));

        let (status, payload) = app.post_json("/user/register", &body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "Username already exists."}));

        let same_email = json!({"username": "lovelace", "email": "ada@x.com", "password": "pw"});
        let (status, payload) = app.post_json("/user/register", &same_email, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "Email already registered."}));
    }

    #[tokio::test]
    async fn user_and_admin_tables_are_independent() {
        let app = TestApp::new().await;
        let body = json!({"username": "ada", "email": "ada@x.com", "password": "secret"});

        let (status, _) = app.post_json("/user/register", &body, None).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, payload) = app.post_json("/admin/register", &body, None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload, json!({"message": "Admin registered successfully!"}));

        let (status, payload) = app.post_json("/admin/register", &body, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "Username already exists."}));
    }

    #[tokio::test]
    async fn registration_requires_every_field() {
        let app = TestApp::new().await;

        for body in [
            json!({"username": "ada", "email": "ada@x.com"}),
            json!({"username": "", "email": "ada@x.com", "password": "secret"}),
            json!({}),
        ] {
            let (status, payload) = app.post_json("/admin/register", &body, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(payload, json!({"error": "All fields are required."}));
        }
    }

    #[tokio::test]
    async fn login_establishes_session_and_logout_clears_it() {
        let app = TestApp::new().await;
        app.post_json(
            "/admin/register",
            &json!({"username": "grace", "email": "grace@x.com", "password": "cobol"}),
            None,
        )
        .await;

        let response = app
            .request(
                Method::POST,
                "/admin/login",
                Some(json!({"username": "grace", "password": "cobol"})),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = TestApp::session_cookie(&response).expect("session cookie");
        let payload = TestApp::json_body(response).await;
        assert_eq!(payload, json!({"message": "Welcome, grace!"}));

        let panel = app.request(Method::GET, "/admin", None, Some(&cookie)).await;
        assert_eq!(panel.status(), StatusCode::OK);

        let (status, payload) = app.post_json("/admin/logout", &json!({}), Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({"message": "Logged out successfully."}));

        let panel = app.request(Method::GET, "/admin", None, Some(&cookie)).await;
        assert_eq!(panel.status(), StatusCode::SEE_OTHER);
        assert_eq!(panel.headers()[header::LOCATION], "/admin/login");
    }

    #[tokio::test]
    async fn bad_credentials_never_create_a_session() {
        let app = TestApp::new().await;
        app.post_json(
            "/user/register",
            &json!({"username": "ada", "email": "ada@x.com", "password": "secret"}),
            None,
        )
        .await;

        for body in [
            json!({"username": "ada", "password": "wrong"}),
            json!({"username": "nobody", "password": "secret"}),
        ] {
            let response = app
                .request(Method::POST, "/user/login", Some(body), None)
                .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(TestApp::session_cookie(&response).is_none());
            let payload = TestApp::json_body(response).await;
            assert_eq!(payload, json!({"error": "Invalid username or password."}));
        }

        assert_eq!(app.session_count().await, 0);
    }

    #[tokio::test]
    async fn user_session_does_not_open_the_admin_panel() {
        let app = TestApp::new().await;
        app.post_json(
            "/user/register",
            &json!({"username": "ada", "email": "ada@x.com", "password": "secret"}),
            None,
        )
        .await;

        let response = app
            .request(
                Method::POST,
                "/user/login",
                Some(json!({"username": "ada", "password": "secret"})),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = TestApp::session_cookie(&response).expect("session cookie");

        let panel = app.request(Method::GET, "/admin", None, Some(&cookie)).await;
        assert_eq!(panel.status(), StatusCode::SEE_OTHER);

        let (status, _) = app.post_json("/user/logout", &json!({}), Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.session_count().await, 0);
    }
}
