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
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use inkwell_core::models::{
    category::parse_tag_list,
    comment::Comment,
    permission::Permission,
    post::Post,
};
use inkwell_db::repositories::{
    CategoryRepository, CommentRepository, HomePageRepository, PostFilter, PostRepository,
    TagRepository,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{Authorized, BloggerPolicy, CurrentUser, UserPolicy},
    error::AppError,
    flash,
    handlers::{auth::FormErrors, checked, ensure_in_range, non_blank, PageQuery},
    template_context::PageContext,
    AppState,
};

const SHOW_COOKIE: &str = "show";
const SHOW_COOKIE_DAYS: i64 = 30;

/// Post editor fields. Checkboxes arrive only when ticked.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PostForm {
    pub title: String,
    #[serde(default)]
    pub intro: String,
    pub body: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub tags: String,
    pub published: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

#[derive(Serialize)]
struct CategoryCount {
    id: i64,
    name: String,
    posts: i64,
}

/// Categories and tags for the listing sidebar.
async fn insert_sidebar(state: &AppState, ctx: &mut PageContext) -> Result<(), AppError> {
    let categories: Vec<CategoryCount> = CategoryRepository::new(state.db.clone())
        .list_with_counts()
        .await?
        .into_iter()
        .map(|(category, posts)| CategoryCount {
            id: category.id,
            name: category.name,
            posts,
        })
        .collect();
    let tags = TagRepository::new(state.db.clone()).list_in_use().await?;

    ctx.insert("categories", &categories);
    ctx.insert("tags", &tags);
    Ok(())
}

async fn render_listing(
    state: &AppState,
    mut ctx: PageContext,
    filter: PostFilter,
    query: &PageQuery,
    heading: &str,
    pager_base: &str,
) -> Result<Response, AppError> {
    let posts = PostRepository::new(state.db.clone());
    let per_page = state.config.pagination.posts_per_page;
    let total = posts.count(filter).await?;
    let page = posts.list(filter, query.resolve(per_page, total), per_page).await?;
    ensure_in_range(&page, state)?;

    insert_sidebar(state, &mut ctx).await?;
    ctx.insert("posts", &page);
    ctx.insert("heading", heading);
    ctx.insert("pager_base", pager_base);
    Ok(ctx.render(state, "listing.html")?.into_response())
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let follower = ctx.user.id().filter(|_| {
        jar.get(SHOW_COOKIE)
            .is_some_and(|cookie| cookie.value() == "followed")
    });
    let filter = match follower {
        Some(id) => PostFilter::FollowedBy(id),
        None => PostFilter::Published,
    };

    let posts = PostRepository::new(state.db.clone());
    let per_page = state.config.pagination.posts_per_page;
    let total = posts.count(filter).await?;
    let page = posts.list(filter, query.resolve(per_page, total), per_page).await?;
    ensure_in_range(&page, &state)?;

    let home_views = HomePageRepository::new(state.db.clone()).increment().await?;

    insert_sidebar(&state, &mut ctx).await?;
    ctx.insert("posts", &page);
    ctx.insert("show_followed", &follower.is_some());
    ctx.insert("home_views", &home_views);
    ctx.insert("pager_base", "/blog/");
    Ok(ctx.render(&state, "index.html")?.into_response())
}

fn show_cookie(value: &'static str) -> Cookie<'static> {
    Cookie::build((SHOW_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::days(SHOW_COOKIE_DAYS))
        .build()
}

pub async fn show_all(jar: CookieJar) -> Response {
    (jar.add(show_cookie("all")), Redirect::to("/blog/")).into_response()
}

pub async fn show_followed(_current: CurrentUser, jar: CookieJar) -> Response {
    (jar.add(show_cookie("followed")), Redirect::to("/blog/")).into_response()
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
    mut ctx: PageContext,
) -> Result<Response, AppError> {
    let posts = PostRepository::new(state.db.clone());
    let mut summary = posts
        .find_summary(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    let identity = ctx.user.identity();
    let is_author = ctx.user.id() == Some(summary.post.author_id);
    let is_moderator = Permission::moderator().allows(&identity);

    if !summary.post.published && !is_author && !is_moderator {
        return Err(AppError::not_found("Post not found"));
    }

    if !is_author {
        summary.post.view_times = posts.increment_view(id).await?;
    }

    let comments = CommentRepository::new(state.db.clone());
    let per_page = state.config.pagination.comments_per_page;
    let total = comments.count_for_post(id).await?;
    let page = comments
        .list_for_post(id, query.resolve(per_page, total), per_page)
        .await?;
    ensure_in_range(&page, &state)?;

    let confirmed = ctx
        .user
        .0
        .as_ref()
        .is_some_and(|current| current.user.confirmed);
    let can_edit = (is_author && Permission::blogger().allows(&identity)) || is_moderator;

    ctx.insert("post", &summary);
    ctx.insert("comments", &page);
    ctx.insert("can_edit", &can_edit);
    ctx.insert("can_comment", &(confirmed && Permission::user().allows(&identity)));
    ctx.insert("can_moderate", &is_moderator);
    ctx.insert("pager_base", &format!("/blog/post/{}", id));
    Ok(ctx.render(&state, "post.html")?.into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    current: Authorized<UserPolicy>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let post = PostRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    if !post.published
        && post.author_id != current.id
        && !current.can(&Permission::moderator())
    {
        return Err(AppError::not_found("Post not found"));
    }

    let back = format!("/blog/post/{}", id);
    let Ok(comment) = Comment::new(current.id, id, &form.body) else {
        let jar = flash::warning(jar, "Comment cannot be empty.");
        return Ok((jar, Redirect::to(&back)).into_response());
    };
    CommentRepository::new(state.db.clone())
        .create(&comment)
        .await?;
    tracing::debug!(post_id = id, user = %current.user.username, "Comment added");

    let jar = flash::success(jar, "Your comment has been published.");
    Ok((jar, Redirect::to(&format!("{}?page=-1#comments", back))).into_response())
}

/// Checks the editor form. Returns the errors and the chosen category.
async fn validate_post_form(
    state: &AppState,
    form: &PostForm,
) -> Result<(FormErrors, Option<i64>), AppError> {
    let mut errors = FormErrors::new();
    if let Err(e) = Post::validate_title(&form.title) {
        errors.insert("title", e);
    }
    if form.body.trim().is_empty() {
        errors.insert("body", "Body cannot be empty.".to_string());
    }

    let mut category_id = None;
    if let Some(raw) = non_blank(&form.category_id) {
        let category = match raw.parse::<i64>() {
            Ok(id) => CategoryRepository::new(state.db.clone()).find_by_id(id).await?,
            Err(_) => None,
        };
        match category {
            Some(category) => category_id = Some(category.id),
            None => {
                errors.insert("category_id", "Unknown category.".to_string());
            }
        }
    }

    Ok((errors, category_id))
}

async fn render_editor(
    state: &AppState,
    mut ctx: PageContext,
    form: &PostForm,
    errors: &FormErrors,
    action: &str,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.db.clone()).list().await?;
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("categories", &categories);
    ctx.insert("action", action);
    Ok(ctx.render(state, "post_edit.html")?.into_response())
}

pub async fn write_post_form(
    State(state): State<AppState>,
    _current: Authorized<BloggerPolicy>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let form = PostForm {
        published: Some("on".to_string()),
        ..PostForm::default()
    };
    render_editor(&state, ctx, &form, &FormErrors::new(), "/blog/write").await
}

pub async fn write_post(
    State(state): State<AppState>,
    current: Authorized<BloggerPolicy>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let (errors, category_id) = validate_post_form(&state, &form).await?;
    if !errors.is_empty() {
        return render_editor(&state, ctx, &form, &errors, "/blog/write").await;
    }

    let mut post = Post::new(
        current.id,
        form.title.trim().to_string(),
        form.intro.trim().to_string(),
        &form.body,
    )?;
    post.published = checked(&form.published);
    post.category_id = category_id;

    let id = PostRepository::new(state.db.clone())
        .create_with_tags(&post, &parse_tag_list(&form.tags))
        .await?;
    tracing::info!(post_id = id, user = %current.user.username, "Post created");

    let message = if post.published {
        "Your post has been published."
    } else {
        "Your post has been saved as a draft."
    };
    let jar = flash::success(jar, message);
    Ok((jar, Redirect::to(&format!("/blog/post/{}", id))).into_response())
}

/// Loads a post the current user may edit: its author with blogger
/// rights, or any moderator.
async fn editable_post(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
) -> Result<Result<Post, Response>, AppError> {
    let post = PostRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;

    if !current.user.confirmed {
        return Ok(Err(Redirect::to("/blog/unconfirmed").into_response()));
    }

    let is_author = post.author_id == current.id && current.can(&Permission::blogger());
    if !is_author && !current.can(&Permission::moderator()) {
        return Err(AppError::forbidden("You cannot edit this post"));
    }
    Ok(Ok(post))
}

pub async fn edit_post_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let post = match editable_post(&state, &current, id).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    let tags = PostRepository::new(state.db.clone())
        .tags_for_post(id)
        .await?
        .into_iter()
        .map(|tag| tag.name)
        .collect::<Vec<_>>()
        .join(", ");
    let form = PostForm {
        title: post.title.clone(),
        intro: post.intro.clone(),
        body: post.body().to_string(),
        category_id: post.category_id.map(|c| c.to_string()).unwrap_or_default(),
        tags,
        published: post.published.then(|| "on".to_string()),
    };
    render_editor(
        &state,
        ctx,
        &form,
        &FormErrors::new(),
        &format!("/blog/edit/{}", id),
    )
    .await
}

pub async fn edit_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    jar: CookieJar,
    ctx: PageContext,
    Form(form): Form<PostForm>,
) -> Result<Response, AppError> {
    let mut post = match editable_post(&state, &current, id).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    let (errors, category_id) = validate_post_form(&state, &form).await?;
    if !errors.is_empty() {
        return render_editor(&state, ctx, &form, &errors, &format!("/blog/edit/{}", id)).await;
    }

    post.title = form.title.trim().to_string();
    post.intro = form.intro.trim().to_string();
    post.set_body(&form.body);
    post.published = checked(&form.published);
    post.category_id = category_id;

    PostRepository::new(state.db.clone())
        .update_with_tags(&post, &parse_tag_list(&form.tags))
        .await?;
    tracing::info!(post_id = id, user = %current.user.username, "Post updated");

    let jar = flash::success(jar, "The post has been updated.");
    Ok((jar, Redirect::to(&format!("/blog/post/{}", id))).into_response())
}

pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Err(redirect) = editable_post(&state, &current, id).await? {
        return Ok(redirect);
    }

    PostRepository::new(state.db.clone()).delete(id).await?;
    tracing::info!(post_id = id, user = %current.user.username, "Post deleted");

    let jar = flash::success(jar, "The post has been deleted.");
    Ok((jar, Redirect::to("/blog/")).into_response())
}

pub async fn category_posts(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let category = CategoryRepository::new(state.db.clone())
        .find_by_name(&name)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    render_listing(
        &state,
        ctx,
        PostFilter::Category(category.id),
        &query,
        &format!("Category: {}", category.name),
        &format!("/blog/category/{}", urlencoding::encode(&category.name)),
    )
    .await
}

pub async fn tag_posts(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let tag = TagRepository::new(state.db.clone())
        .find_by_name(&name)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;

    render_listing(
        &state,
        ctx,
        PostFilter::Tag(tag.id),
        &query,
        &format!("Tag: {}", tag.name),
        &format!("/blog/tag/{}", urlencoding::encode(&tag.name)),
    )
    .await
}
