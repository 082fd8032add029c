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
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use inkwell_core::models::{
    permission::{Capabilities, Identity, Permission},
    session::Session,
    user::User,
};
use inkwell_db::repositories::{RoleRepository, SessionRepository, UserRepository};
use std::{marker::PhantomData, ops::Deref};

use crate::{error::AppError, session::SESSION_COOKIE, session_activity::is_idle, AppState};

/// Current authenticated user, extracted from request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub user: User,
    pub session: Session,
    pub identity: Identity,
}

impl CurrentUser {
    pub fn can(&self, permission: &Permission) -> bool {
        permission.allows(&self.identity)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(&self.identity)
    }
}

/// Why an extractor refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in; carries the path to come back to.
    LoginRequired { next: String },
    Unconfirmed,
    Forbidden,
    Error(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            AuthRejection::Unconfirmed => Redirect::to("/blog/unconfirmed").into_response(),
            AuthRejection::Forbidden => {
                AppError::forbidden("You don't have permission to access this page").into_response()
            }
            AuthRejection::Error(err) => err.into_response(),
        }
    }
}

impl From<AppError> for AuthRejection {
    fn from(err: AppError) -> Self {
        AuthRejection::Error(err)
    }
}

pub fn login_url(next: &str) -> String {
    format!("/blog/login?next={}", urlencoding::encode(next))
}

/// Resolved once per request and shared between extractors.
#[derive(Clone)]
struct ResolvedUser(Option<CurrentUser>);

async fn resolve_user(parts: &mut Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    if let Some(ResolvedUser(user)) = parts.extensions.get::<ResolvedUser>() {
        return Ok(user.clone());
    }

    let user = load_user(&parts.headers, state).await?;
    parts.extensions.insert(ResolvedUser(user.clone()));
    Ok(user)
}

/// The logged-in user for the session cookie in `headers`, if any.
pub(crate) async fn load_user(headers: &HeaderMap, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let jar = CookieJar::from_headers(headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let sessions = SessionRepository::new(state.db.clone());
    let Some(session) = sessions.find_by_id(cookie.value()).await? else {
        return Ok(None);
    };

    if session.is_expired() || is_idle(&session, state.config.session.timeout_minutes) {
        sessions.delete(&session.id).await?;
        return Ok(None);
    }

    let users = UserRepository::new(state.db.clone());
    let user = match users.find_by_id(session.user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Ok(None),
    };

    let roles = RoleRepository::new(state.db.clone())
        .roles_for_user(session.user_id)
        .await?;

    Ok(Some(CurrentUser {
        id: session.user_id,
        identity: Identity::for_user(session.user_id, roles),
        user,
        session,
    }))
}

/// Path and query of the request as the client sent it, before nesting.
fn original_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match resolve_user(parts, &app_state).await? {
            Some(user) => Ok(user),
            None => Err(AuthRejection::LoginRequired {
                next: original_path(parts),
            }),
        }
    }
}

/// Optional authenticated user
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    /// The anonymous identity when nobody is logged in.
    pub fn identity(&self) -> Identity {
        self.0
            .as_ref()
            .map(|user| user.identity.clone())
            .unwrap_or_else(Identity::anonymous)
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(OptionalUser(resolve_user(parts, &app_state).await?))
    }
}

/// A permission predicate a route requires.
pub trait Policy: Send + Sync + 'static {
    fn permission() -> Permission;
}

pub struct AdminPolicy;
pub struct ModeratorPolicy;
pub struct BloggerPolicy;
pub struct UserPolicy;

impl Policy for AdminPolicy {
    fn permission() -> Permission {
        Permission::admin()
    }
}

impl Policy for ModeratorPolicy {
    fn permission() -> Permission {
        Permission::moderator()
    }
}

impl Policy for BloggerPolicy {
    fn permission() -> Permission {
        Permission::blogger()
    }
}

impl Policy for UserPolicy {
    fn permission() -> Permission {
        Permission::user()
    }
}

/// A confirmed, logged-in user whose roles satisfy `P`.
pub struct Authorized<P: Policy> {
    pub current: CurrentUser,
    policy: PhantomData<P>,
}

impl<P: Policy> Deref for Authorized<P> {
    type Target = CurrentUser;

    fn deref(&self) -> &CurrentUser {
        &self.current
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    P: Policy,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.confirmed {
            return Err(AuthRejection::Unconfirmed);
        }
        if !current.can(&P::permission()) {
            tracing::debug!(user = %current.user.username, "Permission denied");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Authorized {
            current,
            policy: PhantomData,
        })
    }
}
