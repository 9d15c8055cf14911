use anyhow::{Context, Result};
use tokio::time::{Duration, sleep};
use tracing::{error, info};

use crate::web::{AppState, auth};

const CLEANUP_INTERVAL_MINUTES: u64 = 15;

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(CLEANUP_INTERVAL_MINUTES * 60);
        loop {
            if let Err(err) = run_cleanup_cycle(&state).await {
                error!(?err, "session cleanup cycle failed");
            }
            sleep(interval).await;
        }
    });
}

async fn run_cleanup_cycle(state: &AppState) -> Result<u64> {
    let purged_sessions = auth::purge_expired_sessions(state.pool_ref())
        .await
        .context("failed to purge expired sessions")?;

    if purged_sessions > 0 {
        info!(purged_sessions, "session cleanup completed");
    }

    Ok(purged_sessions)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::web::test_support::TestApp;

    #[tokio::test]
    async fn cleanup_removes_only_expired_sessions() {
        let app = TestApp::new().await;
        let pool = app.state().pool_ref();
        let now = Utc::now().timestamp();

        for (token, expires_at) in [("expired", now - 60), ("live", now + 3600)] {
            sqlx::query(
                "INSERT INTO sessions (id, user_id, username, expires_at, created_at) VALUES (?, 1, 'ada', ?, ?)",
            )
            .bind(token)
            .bind(expires_at)
            .bind(now)
            .execute(pool)
            .await
            .expect("insert session");
        }

        let purged = run_cleanup_cycle(app.state()).await.expect("cleanup");
        assert_eq!(purged, 1);
        assert_eq!(app.session_count().await, 1);
    }
}
