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

//! Double-submit CSRF protection: every unsafe request must echo the
//! `csrf_token` cookie in a form field or header.

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::{error::AppError, AppState};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_FIELD: &str = "csrf_token";
const CSRF_HEADER_NAME: &str = "X-CSRF-Token";
const CSRF_TOKEN_LENGTH: usize = 32;
const MAX_FORM_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    pub token: String,
}

impl CsrfToken {
    pub fn new() -> Self {
        let mut bytes = [0u8; CSRF_TOKEN_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    pub fn verify(&self, provided_token: &str) -> bool {
        !self.token.is_empty() && self.token == provided_token
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CsrfToken>().cloned().unwrap_or_default())
    }
}

pub async fn csrf_protection_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let existing = CookieJar::from_headers(request.headers())
        .get(CSRF_COOKIE)
        .map(|cookie| CsrfToken {
            token: cookie.value().to_string(),
        })
        .filter(|token| !token.token.is_empty());

    let mut request = if is_safe(request.method()) {
        request
    } else {
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => return AppError::bad_request("Request body too large").into_response(),
        };

        let provided = header_token(&parts).or_else(|| form_token(&parts, &bytes));
        let valid = matches!((&existing, provided), (Some(expected), Some(token)) if expected.verify(&token));
        if !valid {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with missing or invalid CSRF token");
            return AppError::forbidden("Invalid CSRF token").into_response();
        }

        Request::from_parts(parts, Body::from(bytes))
    };

    let token = existing.clone().unwrap_or_default();
    request.extensions_mut().insert(token.clone());

    let mut response = next.run(request).await;

    if existing.is_none() {
        let cookie = Cookie::build((CSRF_COOKIE, token.token))
            .path("/")
            .http_only(true)
            .secure(state.config.session.secure_cookies)
            .same_site(SameSite::Lax)
            .build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn header_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn form_token(parts: &Parts, body: &[u8]) -> Option<String> {
    let is_form = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return None;
    }

    serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_random_and_url_safe() {
        let a = CsrfToken::new();
        let b = CsrfToken::new();
        assert_ne!(a, b);
        assert_eq!(a.token.len(), 43);
        assert!(a
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_verify() {
        let token = CsrfToken {
            token: "abc".to_string(),
        };
        assert!(token.verify("abc"));
        assert!(!token.verify("abd"));
        assert!(!CsrfToken {
            token: String::new()
        }
        .verify(""));
    }

    #[test]
    fn test_form_token_extraction() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        assert_eq!(
            form_token(&parts, b"title=Hi&csrf_token=xyz"),
            Some("xyz".to_string())
        );
        assert_eq!(form_token(&parts, b"title=Hi"), None);
    }
}
