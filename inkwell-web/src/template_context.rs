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
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Html,
};
use inkwell_core::models::{permission::Capabilities, user::User};
use serde::Serialize;
use tera::Context;

use crate::{
    auth::OptionalUser,
    csrf::CsrfToken,
    error::AppError,
    flash::{FlashMessage, IncomingFlashes},
    AppState,
};

/// Variables every page template can rely on.
pub fn base_context(
    state: &AppState,
    user: Option<&User>,
    capabilities: Capabilities,
    csrf_token: &str,
    flashes: &[FlashMessage],
) -> Context {
    let mut context = Context::new();
    context.insert("site_title", &state.config.site_title);
    context.insert("current_user", &user);
    context.insert("is_authenticated", &user.is_some());
    context.insert("can", &capabilities);
    context.insert("csrf_token", csrf_token);
    context.insert("flashes", flashes);
    context
}

/// A template context pre-filled with the base variables for this request.
pub struct PageContext {
    pub user: OptionalUser,
    context: Context,
}

impl PageContext {
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    pub fn render(&self, state: &AppState, template: &str) -> Result<Html<String>, AppError> {
        Ok(Html(state.templates.render(template, &self.context)?))
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = OptionalUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);

        let csrf = parts.extensions.get::<CsrfToken>().cloned().unwrap_or_default();
        let flashes = parts
            .extensions
            .get::<IncomingFlashes>()
            .map(|incoming| incoming.0.clone())
            .unwrap_or_default();

        let capabilities = user
            .0
            .as_ref()
            .map(|current| current.capabilities())
            .unwrap_or_default();

        let context = base_context(
            &app_state,
            user.0.as_ref().map(|current| &current.user),
            capabilities,
            &csrf.token,
            &flashes,
        );

        Ok(PageContext { user, context })
    }
}
