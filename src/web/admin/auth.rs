use axum::response::Redirect;
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::error;

use crate::web::{AppState, auth};

/// The signed-in administrator's id and username, or a redirect to the login page.
pub async fn require_admin_session(
    state: &AppState,
    jar: &SignedCookieJar,
) -> Result<(i64, String), Redirect> {
    let session = match auth::load_session(state.pool_ref(), jar).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(Redirect::to("/admin/login")),
        Err(err) => {
            error!(?err, "failed to load admin session");
            return Err(Redirect::to("/admin/login"));
        }
    };

    session
        .admin()
        .map(|(id, username)| (id, username.to_string()))
        .ok_or_else(|| Redirect::to("/admin/login"))
}
