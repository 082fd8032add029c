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
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use inkwell_core::models::category::validate_label;
use inkwell_db::repositories::CategoryRepository;
use serde::Deserialize;

use crate::{
    auth::{AdminPolicy, Authorized},
    error::AppError,
    flash,
    template_context::PageContext,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

async fn render_categories(
    state: &AppState,
    mut ctx: PageContext,
    error: Option<&str>,
    name: &str,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.db.clone())
        .list_with_counts()
        .await?
        .into_iter()
        .map(|(category, posts)| serde_json::json!({ "id": category.id, "name": category.name, "posts": posts }))
        .collect::<Vec<_>>();

    ctx.insert("categories", &categories);
    ctx.insert("error", &error);
    ctx.insert("name", name);
    Ok(ctx.render(state, "categories.html")?.into_response())
}

pub async fn list_categories(
    State(state): State<AppState>,
    _admin: Authorized<AdminPolicy>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    render_categories(&state, ctx, None, "").await
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: Authorized<AdminPolicy>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let name = form.name.trim();
    if let Err(e) = validate_label(name) {
        return render_categories(&state, ctx, Some(&e), name).await;
    }

    let categories = CategoryRepository::new(state.db.clone());
    if categories.find_by_name(name).await?.is_some() {
        return render_categories(&state, ctx, Some("Category already exists."), name).await;
    }

    categories.create(name).await?;
    tracing::info!(category = %name, "Category created");
    let jar = flash::success(jar, format!("Category '{}' created.", name));
    Ok((jar, Redirect::to("/blog/admin/categories")).into_response())
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: Authorized<AdminPolicy>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.db.clone());
    let category = categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    categories.delete(id).await?;
    tracing::info!(category = %category.name, "Category deleted");
    let jar = flash::success(jar, format!("Category '{}' deleted.", category.name));
    Ok((jar, Redirect::to("/blog/admin/categories")).into_response())
}
