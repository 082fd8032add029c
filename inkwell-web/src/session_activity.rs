// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use inkwell_core::models::session::Session;
use inkwell_db::repositories::{SessionRepository, UserRepository};
use sqlx::SqlitePool;

use crate::{session::SESSION_COOKIE, AppState};

/// Refresh the session's last activity and the user's `last_seen` once the
/// request has been handled, so idle checks see the previous value.
pub async fn update_session_activity(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session_id = CookieJar::from_headers(request.headers())
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let response = next.run(request).await;

    if let Some(session_id) = session_id {
        let pool = state.db.clone();
        let timeout_minutes = state.config.session.timeout_minutes;
        tokio::spawn(async move {
            if let Err(e) = record_activity(&pool, &session_id, timeout_minutes).await {
                tracing::debug!("Failed to record session activity: {:#}", e);
            }
        });
    }

    response
}

/// Stale sessions are removed rather than refreshed, so an idle session
/// cannot be revived by a later request.
async fn record_activity(
    pool: &SqlitePool,
    session_id: &str,
    timeout_minutes: i64,
) -> anyhow::Result<()> {
    let sessions = SessionRepository::new(pool.clone());
    let Some(session) = sessions.find_by_id(session_id).await? else {
        return Ok(());
    };
    if session.is_expired() || is_idle(&session, timeout_minutes) {
        return sessions.delete(session_id).await;
    }

    sessions.touch(session_id).await?;
    UserRepository::new(pool.clone()).ping(session.user_id).await
}

/// True when the session has seen no activity for longer than the timeout.
pub fn is_idle(session: &Session, timeout_minutes: i64) -> bool {
    Utc::now() - session.last_activity > Duration::minutes(timeout_minutes)
}
