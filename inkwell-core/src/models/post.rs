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

use crate::markdown;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::category::{Category, Tag};

/// A blog article.
///
/// `body` is Markdown and `body_html` is always derived from it, so both
/// are private: [`Post::set_body`] is the only way to change them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub intro: String,
    body: String,
    body_html: String,
    pub published: bool,
    pub view_times: i64,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post fields exactly as persisted, used when loading from the database.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub id: i64,
    pub title: String,
    pub intro: String,
    pub body: String,
    pub body_html: String,
    pub published: bool,
    pub view_times: i64,
    pub author_id: i64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: i64, title: String, intro: String, body: &str) -> Result<Self> {
        Self::validate_title(&title).map_err(|e| anyhow!("Invalid post: {}", e))?;
        let now = Utc::now();

        let mut post = Self {
            id: None,
            title,
            intro,
            body: String::new(),
            body_html: String::new(),
            published: true,
            view_times: 0,
            author_id,
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        post.set_body(body);
        Ok(post)
    }

    pub fn from_stored(stored: StoredPost) -> Self {
        Self {
            id: Some(stored.id),
            title: stored.title,
            intro: stored.intro,
            body: stored.body,
            body_html: stored.body_html,
            published: stored.published,
            view_times: stored.view_times,
            author_id: stored.author_id,
            category_id: stored.category_id,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    /// Replace the Markdown source and re-render the HTML.
    pub fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
        self.body_html = markdown::render_post(body);
        self.updated_at = Utc::now();
    }

    pub fn validate_title(title: &str) -> Result<(), String> {
        if title.trim().is_empty() {
            return Err("Title cannot be empty".to_string());
        }
        if title.chars().count() > 200 {
            return Err("Title cannot exceed 200 characters".to_string());
        }
        Ok(())
    }

    pub fn is_valid(&self) -> Result<(), String> {
        Self::validate_title(&self.title)?;
        if self.body.trim().is_empty() {
            return Err("Body cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Author fields shown next to posts and comments.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthorInfo {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub avatar_hash: String,
}

/// A post with everything a listing needs to render it.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub post: Post,
    pub author: AuthorInfo,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub comment_count: i64,
}

impl PostSummary {
    pub fn new(
        post: Post,
        author: AuthorInfo,
        category: Option<Category>,
        comment_count: i64,
    ) -> Self {
        Self {
            post,
            author,
            category,
            tags: Vec::new(),
            comment_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_renders_body() {
        let post = Post::new(1, "Hello".into(), "".into(), "**bold** <script>x()</script>").unwrap();
        assert_eq!(post.body(), "**bold** <script>x()</script>");
        assert!(post.body_html().contains("<strong>bold</strong>"));
        assert!(!post.body_html().contains("script"));
        assert!(post.published);
        assert_eq!(post.view_times, 0);
    }

    #[test]
    fn test_set_body_rederives_html() {
        let mut post = Post::new(1, "Hello".into(), "".into(), "first").unwrap();
        let before = post.updated_at;
        post.set_body("# second");
        assert!(post.body_html().contains("<h1>second</h1>"));
        assert!(!post.body_html().contains("first"));
        assert!(post.updated_at >= before);
    }

    #[test]
    fn test_title_required() {
        assert!(Post::new(1, "   ".into(), "".into(), "body").is_err());
        assert!(Post::new(1, "x".repeat(201), "".into(), "body").is_err());
    }

    #[test]
    fn test_is_valid_requires_body() {
        let post = Post::new(1, "Title".into(), "".into(), " ").unwrap();
        assert!(post.is_valid().is_err());
    }

    #[test]
    fn test_from_stored_keeps_html() {
        let now = Utc::now();
        let post = Post::from_stored(StoredPost {
            id: 3,
            title: "t".into(),
            intro: "i".into(),
            body: "b".into(),
            body_html: "<p>b</p>".into(),
            published: false,
            view_times: 9,
            author_id: 2,
            category_id: Some(1),
            created_at: now,
            updated_at: now,
        });
        assert_eq!(post.id, Some(3));
        assert_eq!(post.body_html(), "<p>b</p>");
        assert!(!post.published);
    }
}
