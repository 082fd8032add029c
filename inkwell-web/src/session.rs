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

use anyhow::Result;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;
use inkwell_core::models::session::Session;
use inkwell_db::repositories::SessionRepository;

use crate::AppState;

pub const SESSION_COOKIE: &str = "session_id";
const REMEMBER_DAYS: i64 = 30;

/// Open a session for `user_id` and attach its cookie. With `remember`
/// the session and the cookie outlive the browser.
pub async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    remember: bool,
) -> Result<CookieJar> {
    let session = if remember {
        Session::new_with_expiry(user_id, Duration::days(REMEMBER_DAYS))
    } else {
        Session::new(user_id)
    };
    SessionRepository::new(state.db.clone()).create(&session).await?;

    let mut cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .secure(state.config.session.secure_cookies)
        .same_site(SameSite::Lax)
        .build();
    if remember {
        cookie.set_max_age(cookie::time::Duration::days(REMEMBER_DAYS));
    }

    Ok(jar.add(cookie))
}

/// Delete the server-side session, if any, and drop the cookie.
pub async fn end_session(state: &AppState, jar: CookieJar) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let sessions = SessionRepository::new(state.db.clone());
        if let Err(e) = sessions.delete(cookie.value()).await {
            tracing::warn!("Failed to delete session: {:#}", e);
        }
    }
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
