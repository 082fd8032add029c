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
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use inkwell_core::models::{
    permission::{Permission, RoleName},
    user::User,
};
use inkwell_db::repositories::{FollowRepository, PostFilter, PostRepository, RoleRepository, UserRepository};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{AdminPolicy, Authorized, CurrentUser},
    error::AppError,
    flash,
    handlers::{auth::FormErrors, checked, ensure_in_range, non_blank, PageQuery},
    template_context::PageContext,
    AppState,
};

const PROFILE_FIELD_MAX: usize = 64;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub about_me: String,
}

/// Everything an administrator can change. `roles` repeats once per
/// ticked checkbox, hence the `axum_extra` form extractor.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AdminProfileForm {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub confirmed: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub about_me: String,
}

fn check_profile_fields(form: &ProfileForm, errors: &mut FormErrors) {
    for (field, value) in [("name", &form.name), ("location", &form.location), ("about_me", &form.about_me)] {
        if value.trim().chars().count() > PROFILE_FIELD_MAX {
            errors.insert(field, format!("At most {} characters.", PROFILE_FIELD_MAX));
        }
    }
}

fn apply_profile(user: &mut User, form: &ProfileForm) {
    user.name = non_blank(&form.name);
    user.location = non_blank(&form.location);
    user.about_me = non_blank(&form.about_me);
}

fn profile_form_of(user: &User) -> ProfileForm {
    ProfileForm {
        name: user.name.clone().unwrap_or_default(),
        location: user.location.clone().unwrap_or_default(),
        about_me: user.about_me.clone().unwrap_or_default(),
    }
}

pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let user = UserRepository::new(state.db.clone())
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("Stored user has no id"))?;

    let viewer = ctx.user.id();
    let is_self = viewer == Some(user_id);
    let include_drafts = is_self || Permission::moderator().allows(&ctx.user.identity());
    let filter = PostFilter::Author {
        id: user_id,
        include_drafts,
    };

    let posts = PostRepository::new(state.db.clone());
    let per_page = state.config.pagination.posts_per_page;
    let total = posts.count(filter).await?;
    let page = posts.list(filter, query.resolve(per_page, total), per_page).await?;
    ensure_in_range(&page, &state)?;

    let follows = FollowRepository::new(state.db.clone());
    let (is_following, is_followed_by) = match viewer {
        Some(viewer) if !is_self => (
            follows.is_following(viewer, user_id).await?,
            follows.is_followed_by(viewer, user_id).await?,
        ),
        _ => (false, false),
    };
    let roles = RoleRepository::new(state.db.clone())
        .roles_for_user(user_id)
        .await?;

    ctx.insert("user", &user);
    ctx.insert("avatar_url", &user.avatar_url(256));
    ctx.insert("roles", &roles);
    ctx.insert("is_self", &is_self);
    ctx.insert("posts", &page);
    ctx.insert("post_count", &total);
    ctx.insert("follower_count", &follows.follower_count(user_id).await?);
    ctx.insert("following_count", &follows.following_count(user_id).await?);
    ctx.insert("is_following", &is_following);
    ctx.insert("is_followed_by", &is_followed_by);
    ctx.insert("pager_base", &format!("/blog/user/{}", user.username));
    Ok(ctx.render(&state, "user.html")?.into_response())
}

fn render_profile_form(
    state: &AppState,
    mut ctx: PageContext,
    form: &ProfileForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(ctx.render(state, "edit_profile.html")?.into_response())
}

pub async fn edit_profile_form(
    State(state): State<AppState>,
    current: CurrentUser,
    ctx: PageContext,
) -> Result<Response, AppError> {
    render_profile_form(&state, ctx, &profile_form_of(&current.user), &FormErrors::new())
}

pub async fn edit_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let mut errors = FormErrors::new();
    check_profile_fields(&form, &mut errors);
    if !errors.is_empty() {
        return render_profile_form(&state, ctx, &form, &errors);
    }

    let mut user = current.user;
    apply_profile(&mut user, &form);
    UserRepository::new(state.db.clone()).update(&user).await?;

    let jar = flash::success(jar, "Your profile has been updated.");
    Ok((jar, Redirect::to(&format!("/blog/user/{}", user.username))).into_response())
}

async fn render_admin_form(
    state: &AppState,
    mut ctx: PageContext,
    user: &User,
    form: &AdminProfileForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let roles = RoleRepository::new(state.db.clone()).list().await?;
    ctx.insert("user", user);
    ctx.insert("all_roles", &roles);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(ctx.render(state, "edit_profile_admin.html")?.into_response())
}

async fn load_user(state: &AppState, id: i64) -> Result<User, AppError> {
    UserRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn edit_profile_admin_form(
    State(state): State<AppState>,
    _admin: Authorized<AdminPolicy>,
    Path(id): Path<i64>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let user = load_user(&state, id).await?;
    let roles = RoleRepository::new(state.db.clone())
        .roles_for_user(id)
        .await?;

    let profile = profile_form_of(&user);
    let form = AdminProfileForm {
        email: user.email.clone(),
        username: user.username.clone(),
        roles: roles.iter().map(|role| role.as_str().to_string()).collect(),
        confirmed: user.confirmed.then(|| "on".to_string()),
        name: profile.name,
        location: profile.location,
        about_me: profile.about_me,
    };
    render_admin_form(&state, ctx, &user, &form, &FormErrors::new()).await
}

pub async fn edit_profile_admin(
    State(state): State<AppState>,
    admin: Authorized<AdminPolicy>,
    Path(id): Path<i64>,
    jar: CookieJar,
    ctx: PageContext,
    axum_extra::extract::Form(form): axum_extra::extract::Form<AdminProfileForm>,
) -> Result<Response, AppError> {
    let mut user = load_user(&state, id).await?;
    let users = UserRepository::new(state.db.clone());
    let email = form.email.trim();
    let username = form.username.trim();
    let mut errors = FormErrors::new();

    if let Err(e) = User::validate_email(email) {
        errors.insert("email", e);
    } else if users.email_taken(email, Some(id)).await? {
        errors.insert("email", "Email already registered.".to_string());
    }
    if let Err(e) = User::validate_username(username) {
        errors.insert("username", e);
    } else if users.username_taken(username, Some(id)).await? {
        errors.insert("username", "Username already in use.".to_string());
    }

    let mut roles = Vec::new();
    for raw in &form.roles {
        match raw.parse::<RoleName>() {
            Ok(role) if !roles.contains(&role) => roles.push(role),
            Ok(_) => {}
            Err(_) => {
                errors.insert("roles", format!("Unknown role '{}'.", raw));
            }
        }
    }

    let profile = ProfileForm {
        name: form.name.clone(),
        location: form.location.clone(),
        about_me: form.about_me.clone(),
    };
    check_profile_fields(&profile, &mut errors);

    if !errors.is_empty() {
        return render_admin_form(&state, ctx, &user, &form, &errors).await;
    }

    user.set_email(email.to_string())?;
    user.username = username.to_string();
    user.confirmed = checked(&form.confirmed);
    apply_profile(&mut user, &profile);
    users.update_with_roles(&user, &roles).await?;
    tracing::info!(admin = %admin.user.username, user = %user.username, ?roles, "Profile updated by admin");

    let jar = flash::success(jar, "The profile has been updated.");
    Ok((jar, Redirect::to(&format!("/blog/user/{}", user.username))).into_response())
}
