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

//! Comment moderation queue.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use inkwell_db::repositories::CommentRepository;

use crate::{
    auth::{Authorized, ModeratorPolicy},
    error::AppError,
    handlers::{ensure_in_range, PageQuery},
    template_context::PageContext,
    AppState,
};

pub async fn moderate(
    State(state): State<AppState>,
    _moderator: Authorized<ModeratorPolicy>,
    Query(query): Query<PageQuery>,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let comments = CommentRepository::new(state.db.clone());
    let per_page = state.config.pagination.comments_per_page;
    let total = comments.count_all().await?;
    let page = comments
        .list_recent(query.resolve(per_page, total), per_page)
        .await?;
    ensure_in_range(&page, &state)?;

    ctx.insert("comments", &page);
    ctx.insert("pager_base", "/blog/moderate");
    Ok(ctx.render(&state, "moderate.html")?.into_response())
}

fn back_to_queue(query: &PageQuery) -> Response {
    let page = query.page.unwrap_or(1).max(1);
    Redirect::to(&format!("/blog/moderate?page={}", page)).into_response()
}

async fn existing_comment(state: &AppState, id: i64) -> Result<CommentRepository, AppError> {
    let comments = CommentRepository::new(state.db.clone());
    if comments.find_by_id(id).await?.is_none() {
        return Err(AppError::not_found("Comment not found"));
    }
    Ok(comments)
}

pub async fn enable_comment(
    State(state): State<AppState>,
    moderator: Authorized<ModeratorPolicy>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    existing_comment(&state, id).await?.set_disabled(id, false).await?;
    tracing::info!(comment_id = id, moderator = %moderator.user.username, "Comment enabled");
    Ok(back_to_queue(&query))
}

pub async fn disable_comment(
    State(state): State<AppState>,
    moderator: Authorized<ModeratorPolicy>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    existing_comment(&state, id).await?.set_disabled(id, true).await?;
    tracing::info!(comment_id = id, moderator = %moderator.user.username, "Comment disabled");
    Ok(back_to_queue(&query))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    moderator: Authorized<ModeratorPolicy>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    existing_comment(&state, id).await?.delete(id).await?;
    tracing::info!(comment_id = id, moderator = %moderator.user.username, "Comment deleted");
    Ok(back_to_queue(&query))
}
