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

use crate::{
    csrf::csrf_protection_middleware,
    error::AppError,
    error_middleware::error_page_middleware,
    flash::flash_middleware,
    handlers,
    rate_limit::login_rate_limit_middleware,
    request_logging::request_logging_middleware,
    security_headers::create_security_headers_middleware,
    session_activity::update_session_activity,
    AppState,
};
use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let headers_middleware =
        create_security_headers_middleware(state.config.security_headers.clone());
    let static_dir = Path::new(&state.config.static_dir);

    Router::new()
        .route("/", get(|| async { Redirect::to("/blog/") }))
        .route("/.health", get(health))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/blog", get(|| async { Redirect::permanent("/blog/") }))
        .route("/blog/", get(handlers::index))
        .nest("/blog", blog_routes(&state))
        .route("/wechat/", get(handlers::wechat_index))
        .nest("/wechat", wechat_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            update_session_activity,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            csrf_protection_middleware,
        ))
        .layer(middleware::from_fn(flash_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error_page_middleware,
        ))
        .layer(middleware::from_fn(headers_middleware))
        .layer(middleware::from_fn_with_state(
            state.config.slow_request_threshold(),
            request_logging_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Posts, comments, profiles, follows, moderation and accounts.
fn blog_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/all", get(handlers::show_all))
        .route("/followed", get(handlers::show_followed))
        .route(
            "/post/{id}",
            get(handlers::post_detail).post(handlers::add_comment),
        )
        .route(
            "/write",
            get(handlers::write_post_form).post(handlers::write_post),
        )
        .route(
            "/edit/{id}",
            get(handlers::edit_post_form).post(handlers::edit_post),
        )
        .route("/delete/{id}", post(handlers::delete_post))
        .route("/category/{name}", get(handlers::category_posts))
        .route("/tag/{name}", get(handlers::tag_posts))
        .route("/user/{username}", get(handlers::profile))
        .route(
            "/edit-profile",
            get(handlers::edit_profile_form).post(handlers::edit_profile),
        )
        .route(
            "/edit-profile/{id}",
            get(handlers::edit_profile_admin_form).post(handlers::edit_profile_admin),
        )
        .route("/follow/{username}", post(handlers::follow))
        .route("/unfollow/{username}", post(handlers::unfollow))
        .route("/followers/{username}", get(handlers::followers))
        .route("/following/{username}", get(handlers::following))
        .route("/moderate", get(handlers::moderate))
        .route("/moderate/enable/{id}", post(handlers::enable_comment))
        .route("/moderate/disable/{id}", post(handlers::disable_comment))
        .route("/moderate/delete/{id}", post(handlers::delete_comment))
        .route(
            "/admin/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/admin/categories/{id}/delete",
            post(handlers::delete_category),
        )
        .route(
            "/login",
            get(handlers::login_form)
                .post(handlers::login)
                .layer(middleware::from_fn_with_state(
                    state.login_rate_limiter.clone(),
                    login_rate_limit_middleware,
                )),
        )
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route("/confirm", post(handlers::resend_confirmation))
        .route("/confirm/{token}", get(handlers::confirm))
        .route("/unconfirmed", get(handlers::unconfirmed))
        .route(
            "/change-password",
            get(handlers::change_password_form).post(handlers::change_password),
        )
        .route(
            "/reset",
            get(handlers::reset_password_request_form).post(handlers::reset_password_request),
        )
        .route(
            "/reset/{token}",
            get(handlers::reset_password_form).post(handlers::reset_password),
        )
}

/// Static wechat pages and the Wake-on-LAN control page.
fn wechat_routes() -> Router<AppState> {
    Router::new()
        .route("/{page}", get(handlers::wechat_page))
        .route(
            "/control-pc/{mac}",
            get(handlers::control_pc_form).post(handlers::control_pc),
        )
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::not_found("The page you are looking for does not exist")
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::{
        create_post, create_test_app_state, create_user, login, submit, test_server,
    };
    use axum::http::{header, StatusCode};
    use chrono::{Duration, Utc};
    use inkwell_core::models::permission::RoleName;
    use inkwell_db::repositories::{
        CategoryRepository, FollowRepository, PostFilter, PostRepository, SessionRepository,
        UserRepository,
    };
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server.get("/.health").await;
        response.assert_status(StatusCode::OK);
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_health_endpoint_has_security_headers() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server.get("/.health").await;
        response.assert_header(header::X_FRAME_OPTIONS, "DENY");
        response.assert_header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
        response.assert_header(header::REFERRER_POLICY, "strict-origin-when-cross-origin");
        assert!(response
            .header(header::CONTENT_SECURITY_POLICY)
            .to_str()
            .unwrap()
            .contains("default-src 'self'"));
    }

    #[tokio::test]
    async fn test_root_redirects_to_blog() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server.get("/").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/");
    }

    #[tokio::test]
    async fn test_unknown_path_renders_error_page() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server.get("/nowhere").await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body = response.text();
        assert!(body.contains("404 Page Not Found"));
        assert!(body.contains("<html"));
    }

    #[tokio::test]
    async fn test_missing_static_file_is_not_found() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        server
            .get("/static/css/missing.css")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_counts_home_views() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        server.get("/blog/").await.assert_status_ok();
        let body = server.get("/blog/").await.text();
        assert!(body.contains("viewed 2 times"));
    }

    #[tokio::test]
    async fn test_post_without_csrf_token_is_forbidden() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server
            .post("/blog/login")
            .form(&[("login", "ada"), ("password", "secret")])
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_login_required_redirects_with_next() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        let response = server.get("/blog/edit-profile").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            "/blog/login?next=%2Fblog%2Fedit-profile"
        );
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_shows_error() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "ada", &[RoleName::User], true).await;
        let server = test_server(state);

        let response = login(&server, "ada", "wrong").await;
        response.assert_status_ok();
        assert!(response.text().contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn test_login_follows_local_next_only() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "ada", &[RoleName::User], true).await;
        let server = test_server(state);

        let csrf = crate::test_helpers::csrf_token(&server).await;
        let response = server
            .post("/blog/login")
            .form(&[
                ("login", "ada"),
                ("password", "password"),
                ("next", "//evil.example"),
                ("csrf_token", csrf.as_str()),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/");
    }

    #[tokio::test]
    async fn test_login_rejects_next_with_whitespace() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "ada", &[RoleName::User], true).await;

        for next in ["/\t/evil.example", "/\n/evil.example", "/blog/a\nb"] {
            let server = test_server(state.clone());
            let response = submit(
                &server,
                "/blog/login",
                &[("login", "ada"), ("password", "password"), ("next", next)],
            )
            .await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header("location"), "/blog/");
        }
    }

    #[tokio::test]
    async fn test_idle_session_stays_logged_out() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "ada", &[RoleName::User], true).await;
        let db = state.db.clone();
        let server = test_server(state);
        login(&server, "ada", "password").await.assert_status(StatusCode::SEE_OTHER);
        server.get("/blog/edit-profile").await.assert_status_ok();

        // Let the post-request activity update land before backdating.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        sqlx::query("UPDATE sessions SET last_activity = ?")
            .bind(Utc::now() - Duration::days(2))
            .execute(&db)
            .await
            .unwrap();
        let (session_id,): (String,) = sqlx::query_as("SELECT id FROM sessions")
            .fetch_one(&db)
            .await
            .unwrap();

        for _ in 0..2 {
            let response = server.get("/blog/edit-profile").await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(
                response.header("location"),
                "/blog/login?next=%2Fblog%2Fedit-profile"
            );
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        let session = SessionRepository::new(db).find_by_id(&session_id).await.unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_blogger_writes_post_and_reader_comments() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "writer", &[RoleName::Blogger], true).await;
        create_user(&state, "reader", &[RoleName::User], true).await;
        let db = state.db.clone();

        let writer = test_server(state.clone());
        login(&writer, "writer", "password").await.assert_status(StatusCode::SEE_OTHER);
        let csrf = crate::test_helpers::csrf_token(&writer).await;
        let response = writer
            .post("/blog/write")
            .form(&[
                ("title", "First post"),
                ("intro", "Hello"),
                ("body", "Some *markdown* <script>alert(1)</script>"),
                ("tags", "rust, web"),
                ("published", "on"),
                ("csrf_token", csrf.as_str()),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let posts = PostRepository::new(db.clone());
        let total = posts.count(PostFilter::Published).await.unwrap();
        assert_eq!(total, 1);
        let post = posts
            .list(PostFilter::Published, 1, 10)
            .await
            .unwrap()
            .items
            .remove(0);
        let id = post.post.id.unwrap();
        assert!(post.post.body_html().contains("<em>markdown</em>"));
        assert!(!post.post.body_html().contains("<script>"));
        assert_eq!(post.tags.len(), 2);

        let reader = test_server(state);
        login(&reader, "reader", "password").await.assert_status(StatusCode::SEE_OTHER);
        let csrf = crate::test_helpers::csrf_token(&reader).await;
        let response = reader
            .post(&format!("/blog/post/{}", id))
            .form(&[("body", "Nice <iframe src=x></iframe>post"), ("csrf_token", csrf.as_str())])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            format!("/blog/post/{}?page=-1#comments", id).as_str()
        );

        let page = reader.get(&format!("/blog/post/{}?page=-1", id)).await;
        page.assert_status_ok();
        let body = page.text();
        assert!(body.contains("Nice"));
        assert!(!body.contains("<iframe"));
        assert!(body.contains("Your comment has been published."));

        // Views from the reader count, the author's do not.
        writer.get(&format!("/blog/post/{}", id)).await.assert_status_ok();
        let stored = posts.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.view_times, 1);
    }

    #[tokio::test]
    async fn test_plain_user_cannot_write() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "reader", &[RoleName::User], true).await;
        let server = test_server(state);
        login(&server, "reader", "password").await;

        let response = server.get("/blog/write").await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body = response.text();
        assert!(body.contains("Access Denied"));
        assert!(body.contains("/blog/user/reader"));
        assert!(body.contains("Log Out"));
    }

    #[tokio::test]
    async fn test_unconfirmed_user_is_sent_to_unconfirmed_page() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "fresh", &[RoleName::Blogger], false).await;
        let server = test_server(state);
        login(&server, "fresh", "password").await;

        let response = server.get("/blog/write").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/unconfirmed");

        server.get("/blog/unconfirmed").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_denied_admin_is_forbidden() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "banned", &[RoleName::Admin, RoleName::Deny], true).await;
        let server = test_server(state);
        login(&server, "banned", "password").await;

        server
            .get("/blog/admin/categories")
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .get("/blog/moderate")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_register_sends_confirmation_and_confirm_link_works() {
        let (state, mailer) = create_test_app_state().await.unwrap();
        let db = state.db.clone();
        let server = test_server(state);

        let csrf = crate::test_helpers::csrf_token(&server).await;
        let response = server
            .post("/blog/register")
            .form(&[
                ("email", "new@example.com"),
                ("username", "newbie"),
                ("password", "password"),
                ("password2", "password"),
                ("csrf_token", csrf.as_str()),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/login");

        let email = crate::test_helpers::wait_for_email(&mailer).await;
        assert_eq!(email.to, "new@example.com");
        assert_eq!(email.subject, "[Inkwell] Confirm Your Account");
        let link = email
            .text
            .lines()
            .find(|line| line.contains("/blog/confirm/"))
            .unwrap()
            .trim()
            .to_string();
        let path = &link[link.find("/blog/confirm/").unwrap()..];

        login(&server, "newbie", "password").await.assert_status(StatusCode::SEE_OTHER);
        server.get(path).await.assert_status(StatusCode::SEE_OTHER);

        let user = UserRepository::new(db)
            .find_by_username("newbie")
            .await
            .unwrap()
            .unwrap();
        assert!(user.confirmed);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "ada", &[RoleName::User], true).await;
        let server = test_server(state);

        let csrf = crate::test_helpers::csrf_token(&server).await;
        let response = server
            .post("/blog/register")
            .form(&[
                ("email", "other@example.com"),
                ("username", "ada"),
                ("password", "password"),
                ("password2", "password"),
                ("csrf_token", csrf.as_str()),
            ])
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Username already in use."));
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let (state, _) = create_test_app_state().await.unwrap();
        let ada = create_user(&state, "ada", &[RoleName::User], true).await;
        let bob = create_user(&state, "bob", &[RoleName::User], true).await;
        let follows = FollowRepository::new(state.db.clone());
        let server = test_server(state);
        login(&server, "ada", "password").await;
        let csrf = crate::test_helpers::csrf_token(&server).await;

        server
            .post("/blog/follow/bob")
            .form(&[("csrf_token", csrf.as_str())])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert!(follows.is_following(ada, bob).await.unwrap());
        assert!(server.get("/blog/user/bob").await.text().contains("Unfollow"));
        server.get("/blog/followers/bob").await.assert_status_ok();

        server
            .post("/blog/unfollow/bob")
            .form(&[("csrf_token", csrf.as_str())])
            .await
            .assert_status(StatusCode::SEE_OTHER);
        assert!(!follows.is_following(ada, bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_only_author_or_moderator_edits_post() {
        let (state, _) = create_test_app_state().await.unwrap();
        let writer = create_user(&state, "writer", &[RoleName::Blogger], true).await;
        create_user(&state, "rival", &[RoleName::Blogger], true).await;
        create_user(&state, "mod", &[RoleName::Moderator], true).await;
        let id = create_post(&state, writer, "Owned", None, &["old"]).await;
        let posts = PostRepository::new(state.db.clone());
        let edit_path = format!("/blog/edit/{}", id);
        let delete_path = format!("/blog/delete/{}", id);

        let rival = test_server(state.clone());
        login(&rival, "rival", "password").await;
        rival.get(&edit_path).await.assert_status(StatusCode::FORBIDDEN);
        submit(&rival, &delete_path, &[])
            .await
            .assert_status(StatusCode::FORBIDDEN);
        assert!(posts.find_by_id(id).await.unwrap().is_some());

        let author = test_server(state.clone());
        login(&author, "writer", "password").await;
        author.get(&edit_path).await.assert_status_ok();
        let response = submit(
            &author,
            &edit_path,
            &[
                ("title", "Owned and edited"),
                ("body", "Now **bold** <script>alert(1)</script>"),
                ("tags", "fresh"),
                ("published", "on"),
            ],
        )
        .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), format!("/blog/post/{}", id).as_str());

        let post = posts.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(post.title, "Owned and edited");
        assert!(post.body_html().contains("<strong>bold</strong>"));
        assert!(!post.body_html().contains("<script>"));
        let tags: Vec<_> = posts
            .tags_for_post(id)
            .await
            .unwrap()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(tags, vec!["fresh".to_string()]);

        let moderator = test_server(state);
        login(&moderator, "mod", "password").await;
        moderator.get(&edit_path).await.assert_status_ok();
        let response = submit(&moderator, &delete_path, &[]).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/");
        assert!(posts.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_followed_feed_uses_show_cookie() {
        let (state, _) = create_test_app_state().await.unwrap();
        let ada = create_user(&state, "ada", &[RoleName::User], true).await;
        let bob = create_user(&state, "bob", &[RoleName::Blogger], true).await;
        let carol = create_user(&state, "carol", &[RoleName::Blogger], true).await;
        create_post(&state, bob, "From Bob", None, &[]).await;
        create_post(&state, carol, "From Carol", None, &[]).await;
        FollowRepository::new(state.db.clone())
            .follow(ada, bob)
            .await
            .unwrap();

        let anonymous = test_server(state.clone());
        let response = anonymous.get("/blog/followed").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.header("location"),
            "/blog/login?next=%2Fblog%2Ffollowed"
        );

        let server = test_server(state);
        login(&server, "ada", "password").await;
        let response = server.get("/blog/followed").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/");
        assert_eq!(response.cookie("show").value(), "followed");

        let feed = server.get("/blog/").await.text();
        assert!(feed.contains("From Bob"));
        assert!(!feed.contains("From Carol"));

        server.get("/blog/all").await.assert_status(StatusCode::SEE_OTHER);
        let everything = server.get("/blog/").await.text();
        assert!(everything.contains("From Bob"));
        assert!(everything.contains("From Carol"));
    }

    #[tokio::test]
    async fn test_category_and_tag_listings() {
        let (state, _) = create_test_app_state().await.unwrap();
        let writer = create_user(&state, "writer", &[RoleName::Blogger], true).await;
        let rust = CategoryRepository::new(state.db.clone())
            .create("Rust")
            .await
            .unwrap();
        create_post(&state, writer, "Borrowing explained", Some(rust), &["ownership"]).await;
        create_post(&state, writer, "Sourdough notes", None, &["baking"]).await;
        let server = test_server(state);

        let response = server.get("/blog/category/Rust").await;
        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Category: Rust"));
        assert!(body.contains("Borrowing explained"));
        assert!(!body.contains("Sourdough notes"));

        let body = server.get("/blog/tag/baking").await.text();
        assert!(body.contains("Tag: baking"));
        assert!(body.contains("Sourdough notes"));
        assert!(!body.contains("Borrowing explained"));

        server
            .get("/blog/category/Cooking")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/blog/tag/missing")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleting_category_keeps_its_posts() {
        let (state, _) = create_test_app_state().await.unwrap();
        let admin = create_user(&state, "root", &[RoleName::Admin], true).await;
        let categories = CategoryRepository::new(state.db.clone());
        let rust = categories.create("Rust").await.unwrap();
        let id = create_post(&state, admin, "Categorised", Some(rust), &[]).await;
        let posts = PostRepository::new(state.db.clone());
        let server = test_server(state);
        login(&server, "root", "password").await;

        let response = submit(
            &server,
            &format!("/blog/admin/categories/{}/delete", rust),
            &[],
        )
        .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/blog/admin/categories");

        assert!(categories.find_by_id(rust).await.unwrap().is_none());
        let post = posts.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(post.category_id, None);
    }

    #[tokio::test]
    async fn test_wechat_pages() {
        let (state, _) = create_test_app_state().await.unwrap();
        let server = test_server(state);

        server.get("/wechat/").await.assert_status_ok();
        server.get("/wechat/wechat").await.assert_status_ok();
        server
            .get("/wechat/missing")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get("/wechat/control-pc/00:11:22:33:44:55")
            .await
            .assert_status_ok();
        server
            .get("/wechat/control-pc/not-a-mac")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wake_on_lan_requires_admin() {
        let (state, _) = create_test_app_state().await.unwrap();
        create_user(&state, "reader", &[RoleName::User], true).await;
        let server = test_server(state);
        login(&server, "reader", "password").await;
        let csrf = crate::test_helpers::csrf_token(&server).await;

        server
            .post("/wechat/control-pc/00:11:22:33:44:55")
            .form(&[("csrf_token", csrf.as_str())])
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
