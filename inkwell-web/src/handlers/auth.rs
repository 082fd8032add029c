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

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use inkwell_core::{
    models::{permission::RoleName, user::User},
    tokens::TokenAction,
};
use inkwell_db::repositories::{SessionRepository, UserRepository};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::{
    auth::CurrentUser,
    error::AppError,
    flash,
    handlers::checked,
    mail::send_email,
    session::{end_session, start_session},
    template_context::PageContext,
    AppState,
};

/// Field name to message, rendered inline next to each input.
pub type FormErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginForm {
    /// Email address or username.
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub remember_me: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResetRequestForm {
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResetPasswordForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

/// Only same-site paths are accepted as a post-login destination.
/// Browsers drop tabs and newlines from a `Location`, so any whitespace or
/// control character disqualifies the path.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => "/blog/",
    }
}

fn is_local_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") || path.contains('\\') {
        return false;
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    match path.parse::<Uri>() {
        Ok(uri) => uri.scheme().is_none() && uri.authority().is_none(),
        Err(_) => false,
    }
}

fn check_new_password(password: &str, password2: &str, errors: &mut FormErrors) {
    if password.is_empty() {
        errors.insert("password", "Password is required.".to_string());
    } else if password != password2 {
        errors.insert("password2", "Passwords must match.".to_string());
    }
}

fn redirect_to(path: &str) -> Response {
    Redirect::to(path).into_response()
}

fn render_login(
    state: &AppState,
    mut ctx: PageContext,
    form: &LoginForm,
    error: Option<&str>,
) -> Result<Response, AppError> {
    ctx.insert("form", form);
    ctx.insert("next", &form.next);
    ctx.insert("error", &error);
    Ok(ctx.render(state, "auth/login.html")?.into_response())
}

pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    render_login(&state, ctx, &form, None)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let users = UserRepository::new(state.db.clone());

    let user = match users.find_by_login(form.login.trim()).await? {
        Some(user) if user.is_active => user,
        Some(_) => return render_login(&state, ctx, &form, Some("Account is disabled.")),
        None => {
            return render_login(&state, ctx, &form, Some("Invalid username or password."));
        }
    };

    if !user.verify_password(&form.password)? {
        tracing::info!(login = %form.login, "Failed login attempt");
        return render_login(&state, ctx, &form, Some("Invalid username or password."));
    }

    let user_id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("Stored user has no id"))?;
    let jar = start_session(&state, jar, user_id, checked(&form.remember_me)).await?;
    users.ping(user_id).await?;
    tracing::info!(user = %user.username, "User logged in");

    Ok((jar, Redirect::to(safe_next(form.next.as_deref()))).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = end_session(&state, jar).await;
    let jar = flash::info(jar, "You have been logged out.");
    (jar, Redirect::to("/blog/")).into_response()
}

fn render_register(
    state: &AppState,
    mut ctx: PageContext,
    form: &RegisterForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(ctx.render(state, "auth/register.html")?.into_response())
}

pub async fn register_form(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    render_register(&state, ctx, &RegisterForm::default(), &FormErrors::new())
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let users = UserRepository::new(state.db.clone());
    let email = form.email.trim();
    let username = form.username.trim();
    let mut errors = FormErrors::new();

    if let Err(e) = User::validate_email(email) {
        errors.insert("email", e);
    } else if users.email_taken(email, None).await? {
        errors.insert("email", "Email already registered.".to_string());
    }

    if let Err(e) = User::validate_username(username) {
        errors.insert("username", e);
    } else if users.username_taken(username, None).await? {
        errors.insert("username", "Username already in use.".to_string());
    }

    check_new_password(&form.password, &form.password2, &mut errors);

    if !errors.is_empty() {
        return render_register(&state, ctx, &form, &errors);
    }

    let mut user = User::new(email.to_string(), username.to_string(), &form.password)?;
    let id = users.create(&user, &[RoleName::default_role()]).await?;
    user.id = Some(id);
    tracing::info!(user = %user.username, "New user registered");

    send_confirmation(&state, &user)?;
    let jar = flash::info(jar, "A confirmation email has been sent to you by email.");
    Ok((jar, Redirect::to("/blog/login")).into_response())
}

fn send_confirmation(state: &AppState, user: &User) -> Result<(), AppError> {
    let id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("Cannot confirm an unsaved user"))?;
    let token = state.tokens.generate_default(TokenAction::Confirm, id)?;

    let mut context = Context::new();
    context.insert("site_title", &state.config.site_title);
    context.insert("user", user);
    context.insert(
        "confirm_url",
        &state.config.external_url(&format!("/blog/confirm/{}", token)),
    );
    send_email(state, &user.email, "Confirm Your Account", "email/confirm", &context)?;
    Ok(())
}

pub async fn confirm(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    if current.user.confirmed {
        return Ok(redirect_to("/blog/"));
    }

    let jar = if state.tokens.verify(&token, TokenAction::Confirm, current.id) {
        UserRepository::new(state.db.clone())
            .set_confirmed(current.id)
            .await?;
        tracing::info!(user = %current.user.username, "Account confirmed");
        flash::success(jar, "You have confirmed your account. Thanks!")
    } else {
        flash::warning(jar, "The confirmation link is invalid or has expired.")
    };

    Ok((jar, Redirect::to("/blog/")).into_response())
}

pub async fn resend_confirmation(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if current.user.confirmed {
        return Ok(redirect_to("/blog/"));
    }
    send_confirmation(&state, &current.user)?;
    let jar = flash::info(jar, "A new confirmation email has been sent to you by email.");
    Ok((jar, Redirect::to("/blog/")).into_response())
}

pub async fn unconfirmed(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    match &ctx.user.0 {
        Some(current) if !current.user.confirmed => {
            Ok(ctx.render(&state, "auth/unconfirmed.html")?.into_response())
        }
        _ => Ok(redirect_to("/blog/")),
    }
}

pub async fn change_password_form(
    State(state): State<AppState>,
    _current: CurrentUser,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    ctx.insert("errors", &FormErrors::new());
    Ok(ctx.render(&state, "auth/change_password.html")?.into_response())
}

pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    mut ctx: PageContext,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AppError> {
    let mut errors = FormErrors::new();
    if !current.user.verify_password(&form.old_password)? {
        errors.insert("old_password", "Invalid password.".to_string());
    }
    check_new_password(&form.password, &form.password2, &mut errors);

    if !errors.is_empty() {
        ctx.insert("errors", &errors);
        return Ok(ctx.render(&state, "auth/change_password.html")?.into_response());
    }

    let hash = User::hash_password(&form.password)?;
    UserRepository::new(state.db.clone())
        .update_password(current.id, &hash)
        .await?;
    tracing::info!(user = %current.user.username, "Password changed");

    let jar = flash::success(jar, "Your password has been updated.");
    Ok((jar, Redirect::to("/blog/")).into_response())
}

fn render_reset_request(
    state: &AppState,
    mut ctx: PageContext,
    form: &ResetRequestForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(ctx.render(state, "auth/reset_request.html")?.into_response())
}

pub async fn reset_password_request_form(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    if ctx.user.0.is_some() {
        return Ok(redirect_to("/blog/"));
    }
    render_reset_request(&state, ctx, &ResetRequestForm::default(), &FormErrors::new())
}

pub async fn reset_password_request(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<ResetRequestForm>,
) -> Result<Response, AppError> {
    if ctx.user.0.is_some() {
        return Ok(redirect_to("/blog/"));
    }

    let email = form.email.trim();
    if let Err(e) = User::validate_email(email) {
        let mut errors = FormErrors::new();
        errors.insert("email", e);
        return render_reset_request(&state, ctx, &form, &errors);
    }

    // Same answer whether or not the address is known.
    if let Some(user) = UserRepository::new(state.db.clone())
        .find_by_email(email)
        .await?
    {
        if let Some(id) = user.id {
            let token = state.tokens.generate_default(TokenAction::Reset, id)?;
            let mut context = Context::new();
            context.insert("site_title", &state.config.site_title);
            context.insert("user", &user);
            context.insert(
                "reset_url",
                &state.config.external_url(&format!("/blog/reset/{}", token)),
            );
            send_email(
                &state,
                &user.email,
                "Reset Your Password",
                "email/reset_password",
                &context,
            )?;
        }
    }

    let jar = flash::info(
        jar,
        "An email with instructions to reset your password has been sent to you.",
    );
    Ok((jar, Redirect::to("/blog/login")).into_response())
}

fn render_reset(
    state: &AppState,
    mut ctx: PageContext,
    token: &str,
    form: &ResetPasswordForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    ctx.insert("token", token);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(ctx.render(state, "auth/reset_password.html")?.into_response())
}

pub async fn reset_password_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    if ctx.user.0.is_some() {
        return Ok(redirect_to("/blog/"));
    }
    render_reset(
        &state,
        ctx,
        &token,
        &ResetPasswordForm::default(),
        &FormErrors::new(),
    )
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response, AppError> {
    if ctx.user.0.is_some() {
        return Ok(redirect_to("/blog/"));
    }

    let mut errors = FormErrors::new();
    if form.email.trim().is_empty() {
        errors.insert("email", "Email is required.".to_string());
    }
    check_new_password(&form.password, &form.password2, &mut errors);
    if !errors.is_empty() {
        return render_reset(&state, ctx, &token, &form, &errors);
    }

    // An unknown address and a token issued to someone else get the same
    // answer.
    let users = UserRepository::new(state.db.clone());
    let user_id = users
        .find_by_email(form.email.trim())
        .await?
        .and_then(|user| user.id)
        .filter(|&id| state.tokens.verify(&token, TokenAction::Reset, id));
    let Some(user_id) = user_id else {
        let jar = flash::warning(jar, "The reset link is invalid or has expired.");
        return Ok((jar, Redirect::to("/blog/")).into_response());
    };

    let hash = User::hash_password(&form.password)?;
    users.update_password(user_id, &hash).await?;
    let dropped = SessionRepository::new(state.db.clone())
        .delete_for_user(user_id)
        .await?;
    tracing::info!(user_id, sessions = dropped, "Password reset");

    let jar = flash::success(jar, "Your password has been updated.");
    Ok((jar, Redirect::to("/blog/login")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/blog/write")), "/blog/write");
        assert_eq!(safe_next(Some("/blog/post/1?page=2")), "/blog/post/1?page=2");
    }

    #[test]
    fn test_safe_next_rejects_other_hosts() {
        assert_eq!(safe_next(Some("https://evil.example")), "/blog/");
        assert_eq!(safe_next(Some("//evil.example")), "/blog/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/blog/");
        assert_eq!(safe_next(None), "/blog/");
    }

    #[test]
    fn test_safe_next_rejects_whitespace_and_control_characters() {
        assert_eq!(safe_next(Some("/\t/evil.example")), "/blog/");
        assert_eq!(safe_next(Some("/\n/evil.example")), "/blog/");
        assert_eq!(safe_next(Some("/blog/a\nb")), "/blog/");
        assert_eq!(safe_next(Some("/blog/a\rb")), "/blog/");
        assert_eq!(safe_next(Some("/ /evil.example")), "/blog/");
        assert_eq!(safe_next(Some("/blog/\u{0}")), "/blog/");
    }

    #[test]
    fn test_check_new_password() {
        let mut errors = FormErrors::new();
        check_new_password("secret", "secret", &mut errors);
        assert!(errors.is_empty());

        check_new_password("secret", "other", &mut errors);
        assert_eq!(errors.get("password2").map(String::as_str), Some("Passwords must match."));

        let mut errors = FormErrors::new();
        check_new_password("", "", &mut errors);
        assert!(errors.contains_key("password"));
    }
}
