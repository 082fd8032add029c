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

use anyhow::{Context, Result};
use inkwell_core::models::category::{validate_label, Tag};
use sqlx::{SqliteConnection, SqlitePool};

pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find tag")?;
        Ok(row.map(|(id, name)| Tag { id, name }))
    }

    /// Tags in use by at least one published post.
    pub async fn list_in_use(&self) -> Result<Vec<Tag>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT DISTINCT t.id, t.name FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            JOIN posts p ON p.id = pt.post_id
            WHERE p.published = 1
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tags")?;

        Ok(rows.into_iter().map(|(id, name)| Tag { id, name }).collect())
    }
}

/// Replace a post's tags, creating unknown names on the way. Runs on the
/// caller's connection so it joins the post's transaction.
pub(crate) async fn replace_post_tags(
    conn: &mut SqliteConnection,
    post_id: i64,
    names: &[String],
) -> Result<Vec<Tag>> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
        .bind(post_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear post tags")?;

    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if validate_label(name).is_err() {
            continue;
        }

        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await
            .context("Failed to create tag")?;

        let (id,): (i64,) = sqlx::query_as("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await
            .context("Failed to look up tag")?;

        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(id)
            .execute(&mut *conn)
            .await
            .context("Failed to tag post")?;

        tags.push(Tag {
            id,
            name: name.to_string(),
        });
    }

    Ok(tags)
}
