use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use sqlx::SqlitePool;
use tracing::error;
use uuid::Uuid;

use crate::web::models::{AccountKind, SessionRow};

pub const SESSION_COOKIE: &str = "quickiebot_session";
pub const SESSION_TTL_DAYS: i64 = 7;

/// An identity to attach to the caller's session after a successful login.
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    pub kind: AccountKind,
    pub id: i64,
    pub username: String,
}

#[derive(Clone, Debug)]
pub struct ActiveSession {
    pub data: SessionRow,
}

impl ActiveSession {
    pub fn admin(&self) -> Option<(i64, &str)> {
        match (self.data.admin_id, self.data.admin_username.as_deref()) {
            (Some(id), Some(username)) => Some((id, username)),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<(i64, &str)> {
        match (self.data.user_id, self.data.username.as_deref()) {
            (Some(id), Some(username)) => Some((id, username)),
            _ => None,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn session_token(jar: &SignedCookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok().map(|token| token.to_string())
}

fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_TTL_DAYS));
    cookie
}

/// Resolve the caller's session, ignoring unsigned, unknown or expired tokens.
pub async fn load_session(
    pool: &SqlitePool,
    jar: &SignedCookieJar,
) -> sqlx::Result<Option<ActiveSession>> {
    let Some(token) = session_token(jar) else {
        return Ok(None);
    };

    let data = sqlx::query_as::<_, SessionRow>(
        "SELECT user_id, username, admin_id, admin_username FROM sessions WHERE id = ? AND expires_at > ?",
    )
    .bind(&token)
    .bind(Utc::now().timestamp())
    .fetch_optional(pool)
    .await?;

    Ok(data.map(|data| ActiveSession { data }))
}

/// Attach `identity` to the caller's live session, or open a new one.
pub async fn bind_identity(
    pool: &SqlitePool,
    jar: SignedCookieJar,
    identity: &SessionIdentity,
) -> sqlx::Result<SignedCookieJar> {
    let now = Utc::now();
    let expires_at = (now + ChronoDuration::days(SESSION_TTL_DAYS)).timestamp();

    if let Some(token) = session_token(&jar) {
        let update = match identity.kind {
            AccountKind::User => {
                "UPDATE sessions SET user_id = ?, username = ?, expires_at = ? WHERE id = ? AND expires_at > ?"
            }
            AccountKind::Admin => {
                "UPDATE sessions SET admin_id = ?, admin_username = ?, expires_at = ? WHERE id = ? AND expires_at > ?"
            }
        };
        let updated = sqlx::query(update)
            .bind(identity.id)
            .bind(&identity.username)
            .bind(expires_at)
            .bind(&token)
            .bind(now.timestamp())
            .execute(pool)
            .await?
            .rows_affected();

        if updated > 0 {
            return Ok(jar.add(session_cookie(token)));
        }
    }

    let token = Uuid::new_v4().to_string();
    let (user_id, username, admin_id, admin_username) = match identity.kind {
        AccountKind::User => (Some(identity.id), Some(identity.username.as_str()), None, None),
        AccountKind::Admin => (None, None, Some(identity.id), Some(identity.username.as_str())),
    };

    sqlx::query(
        "INSERT INTO sessions (id, user_id, username, admin_id, admin_username, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(username)
    .bind(admin_id)
    .bind(admin_username)
    .bind(expires_at)
    .bind(now.timestamp())
    .execute(pool)
    .await?;

    Ok(jar.add(session_cookie(token)))
}

/// Drop the whole session, whichever identities it held, and expire the cookie.
pub async fn clear_session(pool: &SqlitePool, jar: SignedCookieJar) -> SignedCookieJar {
    if let Some(token) = session_token(&jar) {
        if let Err(err) = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&token)
            .execute(pool)
            .await
        {
            error!(?err, "failed to remove session during logout");
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar.remove(removal)
}

pub async fn purge_expired_sessions(pool: &SqlitePool) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
