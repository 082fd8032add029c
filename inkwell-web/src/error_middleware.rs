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
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use crate::{auth::load_user, error::ErrorPage, template_context::base_context, AppState};

/// Replace the plain-text body of `AppError` responses with `error.html`.
pub async fn error_page_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    match render_error_page(&state, &headers, response.status(), &page).await {
        Ok(html) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            parts.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            Response::from_parts(parts, Body::from(html))
        }
        Err(e) => {
            tracing::error!("Failed to render error page: {:#}", e);
            response
        }
    }
}

async fn render_error_page(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    page: &ErrorPage,
) -> anyhow::Result<String> {
    // The navigation still reflects who is logged in.
    let user = load_user(headers, state).await.ok().flatten();
    let capabilities = user
        .as_ref()
        .map(|current| current.capabilities())
        .unwrap_or_default();
    let mut context = base_context(
        state,
        user.as_ref().map(|current| &current.user),
        capabilities,
        "",
        &[],
    );
    context.insert("error_code", &status.as_u16());

    let title = match status {
        StatusCode::NOT_FOUND => "Page Not Found",
        StatusCode::FORBIDDEN => "Access Denied",
        StatusCode::TOO_MANY_REQUESTS => "Slow Down",
        s if s.is_server_error() => "Server Error",
        _ => status.canonical_reason().unwrap_or("Error"),
    };
    context.insert("error_title", title);
    context.insert("error_description", &page.message);

    state.templates.render("error.html", &context)
}
