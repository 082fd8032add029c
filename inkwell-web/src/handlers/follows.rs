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
};
use axum_extra::extract::CookieJar;
use inkwell_core::models::user::User;
use inkwell_db::repositories::{FollowRepository, UserRepository};

use crate::{
    auth::{Authorized, UserPolicy},
    error::AppError,
    flash,
    handlers::{ensure_in_range, PageQuery},
    template_context::PageContext,
    AppState,
};

async fn find_user(state: &AppState, username: &str) -> Result<(User, i64), AppError> {
    let user = UserRepository::new(state.db.clone())
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("Stored user has no id"))?;
    Ok((user, id))
}

pub async fn follow(
    State(state): State<AppState>,
    current: Authorized<UserPolicy>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (user, id) = find_user(&state, &username).await?;
    let back = format!("/blog/user/{}", user.username);

    if id == current.id {
        return Ok(Redirect::to(&back).into_response());
    }

    let jar = if FollowRepository::new(state.db.clone())
        .follow(current.id, id)
        .await?
    {
        tracing::debug!(follower = %current.user.username, followed = %user.username, "Follow");
        flash::success(jar, format!("You are now following {}.", user.username))
    } else {
        flash::info(jar, "You are already following this user.")
    };
    Ok((jar, Redirect::to(&back)).into_response())
}

pub async fn unfollow(
    State(state): State<AppState>,
    current: Authorized<UserPolicy>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (user, id) = find_user(&state, &username).await?;
    let back = format!("/blog/user/{}", user.username);

    if id == current.id {
        return Ok(Redirect::to(&back).into_response());
    }

    let jar = if FollowRepository::new(state.db.clone())
        .unfollow(current.id, id)
        .await?
    {
        flash::success(jar, format!("You are not following {} anymore.", user.username))
    } else {
        flash::info(jar, "You are not following this user.")
    };
    Ok((jar, Redirect::to(&back)).into_response())
}

#[derive(Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

async fn follow_list(
    state: AppState,
    username: String,
    query: PageQuery,
    mut ctx: PageContext,
    direction: Direction,
) -> Result<Response, AppError> {
    let (user, id) = find_user(&state, &username).await?;
    let follows = FollowRepository::new(state.db.clone());
    let per_page = state.config.pagination.followers_per_page;

    let (total, title, path) = match direction {
        Direction::Followers => (follows.follower_count(id).await?, "Followers of", "followers"),
        Direction::Following => (follows.following_count(id).await?, "Followed by", "following"),
    };
    let page_num = query.resolve(per_page, total);
    let page = match direction {
        Direction::Followers => follows.followers(id, page_num, per_page).await?,
        Direction::Following => follows.following(id, page_num, per_page).await?,
    };
    ensure_in_range(&page, &state)?;

    ctx.insert("user", &user);
    ctx.insert("title", title);
    ctx.insert("follows", &page);
    ctx.insert("pager_base", &format!("/blog/{}/{}", path, user.username));
    Ok(ctx.render(&state, "followers.html")?.into_response())
}

pub async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    follow_list(state, username, query, ctx, Direction::Followers).await
}

pub async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    follow_list(state, username, query, ctx, Direction::Following).await
}
