//! One-shot messages carried across a redirect in a cookie.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Messages that arrived with the current request.
#[derive(Debug, Clone, Default)]
pub struct IncomingFlashes(pub Vec<FlashMessage>);

/// Queue a message for the next rendered page.
pub fn push(jar: CookieJar, level: FlashLevel, message: impl Into<String>) -> CookieJar {
    let mut messages = read(&jar);
    messages.push(FlashMessage {
        level,
        message: message.into(),
    });

    let cookie = Cookie::build((FLASH_COOKIE, encode(&messages)))
        .path("/")
        .http_only(true)
        .same_site(axum_extra::extract::cookie::SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn info(jar: CookieJar, message: impl Into<String>) -> CookieJar {
    push(jar, FlashLevel::Info, message)
}

pub fn success(jar: CookieJar, message: impl Into<String>) -> CookieJar {
    push(jar, FlashLevel::Success, message)
}

pub fn warning(jar: CookieJar, message: impl Into<String>) -> CookieJar {
    push(jar, FlashLevel::Warning, message)
}

pub fn read(jar: &CookieJar) -> Vec<FlashMessage> {
    jar.get(FLASH_COOKIE)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn encode(messages: &[FlashMessage]) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(messages).unwrap_or_default())
}

fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Exposes pending messages to handlers and clears the cookie once a page
/// (anything but a redirect) has been sent.
pub async fn flash_middleware(mut request: Request, next: Next) -> Response {
    let pending = read(&CookieJar::from_headers(request.headers()));
    let had_pending = !pending.is_empty();
    request.extensions_mut().insert(IncomingFlashes(pending));

    let mut response = next.run(request).await;

    if had_pending && !response.status().is_redirection() && !sets_flash(&response) {
        let mut removal = Cookie::build((FLASH_COOKIE, "")).path("/").build();
        removal.make_removal();
        if let Ok(value) = HeaderValue::from_str(&removal.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn sets_flash(response: &Response) -> bool {
    let prefix = format!("{}=", FLASH_COOKIE);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}
