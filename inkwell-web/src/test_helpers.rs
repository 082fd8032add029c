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

use std::sync::Arc;
use std::time::Duration;

use axum_test::{TestResponse, TestServer, TestServerConfig};
use inkwell_core::models::{permission::RoleName, post::Post, user::User};
use inkwell_db::{init_database, PostRepository, UserRepository};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    autoreload_templates::TemplateEngine,
    config::Config,
    mail::{Email, LogMailer},
    rate_limit::create_login_rate_limiter,
    routes::create_router,
    AppState,
};

static CSRF_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="csrf_token" value="([^"]+)""#).expect("valid regex"));

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.templates_dir = "/nonexistent/inkwell-templates".to_string();
    config.static_dir = "/nonexistent/inkwell-static".to_string();
    config.site_url = "http://localhost:3000".to_string();
    config.session.secure_cookies = false;
    config.session.secret = "test-secret".to_string();
    config.rate_limit.login_attempts_per_minute = 1000;
    config
}

/// Fresh in-memory state. The returned mailer shares its outbox with the
/// one inside the state.
pub async fn create_test_app_state() -> Result<(AppState, LogMailer), anyhow::Error> {
    create_test_app_state_with(test_config()).await
}

pub async fn create_test_app_state_with(
    config: Config,
) -> Result<(AppState, LogMailer), anyhow::Error> {
    let pool = init_database("sqlite::memory:").await?;
    let templates = TemplateEngine::new(&config.templates_dir, false, &config.cdn)?;
    let mailer = LogMailer::new();
    let limiter = create_login_rate_limiter(config.rate_limit.login_attempts_per_minute);
    let state = AppState::new(pool, templates, config, Arc::new(mailer.clone()), limiter);
    Ok((state, mailer))
}

/// Insert a user whose password is `password`.
pub async fn create_user(
    state: &AppState,
    username: &str,
    roles: &[RoleName],
    confirmed: bool,
) -> i64 {
    let user = User::new(
        format!("{}@example.com", username),
        username.to_string(),
        "password",
    )
    .unwrap();
    let users = UserRepository::new(state.db.clone());
    let id = users.create(&user, roles).await.unwrap();
    if confirmed {
        users.set_confirmed(id).await.unwrap();
    }
    id
}

/// Insert a post with the given tags and optional category.
pub async fn create_post(
    state: &AppState,
    author_id: i64,
    title: &str,
    category_id: Option<i64>,
    tags: &[&str],
) -> i64 {
    let mut post = Post::new(author_id, title.to_string(), String::new(), "Body text").unwrap();
    post.published = true;
    post.category_id = category_id;
    let tags: Vec<String> = tags.iter().map(|tag| tag.to_string()).collect();
    PostRepository::new(state.db.clone())
        .create_with_tags(&post, &tags)
        .await
        .unwrap()
}

pub fn test_server(state: AppState) -> TestServer {
    let config = TestServerConfig {
        save_cookies: true,
        ..TestServerConfig::default()
    };
    TestServer::new_with_config(create_router(state), config).unwrap()
}

/// The token embedded in the login form. Also stores the CSRF cookie on
/// the server's cookie jar the first time.
pub async fn csrf_token(server: &TestServer) -> String {
    let body = server.get("/blog/login").await.text();
    CSRF_INPUT
        .captures(&body)
        .map(|captures| captures[1].to_string())
        .expect("login page has a csrf field")
}

pub async fn login(server: &TestServer, login: &str, password: &str) -> TestResponse {
    let csrf = csrf_token(server).await;
    server
        .post("/blog/login")
        .form(&[
            ("login", login),
            ("password", password),
            ("csrf_token", csrf.as_str()),
        ])
        .await
}

/// POST a form with the CSRF field filled in.
pub async fn submit(server: &TestServer, path: &str, fields: &[(&str, &str)]) -> TestResponse {
    let csrf = csrf_token(server).await;
    let mut form = fields.to_vec();
    form.push(("csrf_token", csrf.as_str()));
    server.post(path).form(&form).await
}

/// Mail goes out on a background task.
pub async fn wait_for_email(mailer: &LogMailer) -> Email {
    for _ in 0..100 {
        if let Some(email) = mailer.sent().pop() {
            return email;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no email was sent");
}
