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

use super::post::AuthorInfo;

/// A reader comment on a post. Moderators hide comments by disabling them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Comment {
    pub id: Option<i64>,
    body: String,
    body_html: String,
    pub disabled: bool,
    pub author_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredComment {
    pub id: i64,
    pub body: String,
    pub body_html: String,
    pub disabled: bool,
    pub author_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: i64, post_id: i64, body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Err(anyhow!("Comment cannot be empty"));
        }

        let mut comment = Self {
            id: None,
            body: String::new(),
            body_html: String::new(),
            disabled: false,
            author_id,
            post_id,
            created_at: Utc::now(),
        };
        comment.set_body(body);
        Ok(comment)
    }

    pub fn from_stored(stored: StoredComment) -> Self {
        Self {
            id: Some(stored.id),
            body: stored.body,
            body_html: stored.body_html,
            disabled: stored.disabled,
            author_id: stored.author_id,
            post_id: stored.post_id,
            created_at: stored.created_at,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    pub fn set_body(&mut self, body: &str) {
        self.body = body.to_string();
        self.body_html = markdown::render_comment(body);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author: AuthorInfo,
    pub post_title: String,
}

impl CommentView {
    pub fn new(comment: Comment, author: AuthorInfo, post_title: String) -> Self {
        Self {
            comment,
            author,
            post_title,
        }
    }
}
