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

use anyhow::{anyhow, Context, Result};
use inkwell_core::models::comment::{Comment, CommentView, StoredComment};
use inkwell_core::models::post::AuthorInfo;
use inkwell_core::pagination::{Page, Pagination};
use sqlx::SqlitePool;

use crate::datetime::parse_datetime;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    body: String,
    body_html: String,
    disabled: bool,
    author_id: i64,
    post_id: i64,
    created_at: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = anyhow::Error;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(Comment::from_stored(StoredComment {
            id: row.id,
            body: row.body,
            body_html: row.body_html,
            disabled: row.disabled,
            author_id: row.author_id,
            post_id: row.post_id,
            created_at: parse_datetime(&row.created_at, "created_at")?,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct CommentViewRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    author_username: String,
    author_name: Option<String>,
    author_avatar_hash: String,
    post_title: String,
}

impl TryFrom<CommentViewRow> for CommentView {
    type Error = anyhow::Error;

    fn try_from(row: CommentViewRow) -> Result<Self> {
        let author = AuthorInfo {
            id: row.comment.author_id,
            username: row.author_username,
            name: row.author_name,
            avatar_hash: row.author_avatar_hash,
        };
        Ok(CommentView::new(
            Comment::try_from(row.comment)?,
            author,
            row.post_title,
        ))
    }
}

const VIEW_SELECT: &str = r#"
    SELECT cm.id, cm.body, cm.body_html, cm.disabled, cm.author_id, cm.post_id, cm.created_at,
           u.username AS author_username, u.name AS author_name,
           u.avatar_hash AS author_avatar_hash,
           p.title AS post_title
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
    JOIN posts p ON p.id = cm.post_id
"#;

pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, comment: &Comment) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (body, body_html, disabled, author_id, post_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.body())
        .bind(comment.body_html())
        .bind(comment.disabled)
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, body, body_html, disabled, author_id, post_id, created_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find comment by id")?;

        row.map(Comment::try_from).transpose()
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count comments")?;
        Ok(count.max(0) as u64)
    }

    pub async fn count_all(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count comments")?;
        Ok(count.max(0) as u64)
    }

    /// Comments on a post in the order they were written, disabled ones included.
    pub async fn list_for_post(&self, post_id: i64, page: u32, per_page: u32) -> Result<Page<CommentView>> {
        let total = self.count_for_post(post_id).await?;
        let pagination = Pagination::new(page, per_page, total);

        let sql = format!(
            "{} WHERE cm.post_id = ? ORDER BY cm.created_at ASC, cm.id ASC LIMIT ? OFFSET ?",
            VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(post_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list comments")?;

        let items = rows
            .into_iter()
            .map(CommentView::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, pagination))
    }

    /// Every comment on the site, newest first, for moderation.
    pub async fn list_recent(&self, page: u32, per_page: u32) -> Result<Page<CommentView>> {
        let total = self.count_all().await?;
        let pagination = Pagination::new(page, per_page, total);

        let sql = format!(
            "{} ORDER BY cm.created_at DESC, cm.id DESC LIMIT ? OFFSET ?",
            VIEW_SELECT
        );
        let rows = sqlx::query_as::<_, CommentViewRow>(&sql)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list comments")?;

        let items = rows
            .into_iter()
            .map(CommentView::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, pagination))
    }

    pub async fn set_disabled(&self, id: i64, disabled: bool) -> Result<()> {
        let result = sqlx::query("UPDATE comments SET disabled = ? WHERE id = ?")
            .bind(disabled)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update comment")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Comment with id {} not found", id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Comment with id {} not found", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_database, PostRepository, UserRepository};
    use inkwell_core::models::post::Post;
    use inkwell_core::models::user::User;
    use pretty_assertions::assert_eq;

    async fn setup() -> (CommentRepository, i64, i64) {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let user_id = UserRepository::new(pool.clone())
            .create(&User::new("a@example.com".into(), "alice".into(), "pw").unwrap(), &[])
            .await
            .unwrap();
        let post = Post::new(user_id, "Post".into(), "".into(), "body").unwrap();
        let post_id = PostRepository::new(pool.clone()).create(&post).await.unwrap();
        (CommentRepository::new(pool), user_id, post_id)
    }

    #[tokio::test]
    async fn test_create_strips_disallowed_tags() {
        let (repo, user_id, post_id) = setup().await;
        let comment = Comment::new(user_id, post_id, "nice <iframe src=\"x\"></iframe> **post**").unwrap();
        let id = repo.create(&comment).await.unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert!(!stored.body_html().contains("<iframe"));
        assert!(stored.body_html().contains("<strong>post</strong>"));
    }

    #[tokio::test]
    async fn test_list_for_post_in_order() {
        let (repo, user_id, post_id) = setup().await;
        for body in ["first", "second", "third"] {
            repo.create(&Comment::new(user_id, post_id, body).unwrap())
                .await
                .unwrap();
        }

        let page = repo.list_for_post(post_id, 1, 2).await.unwrap();
        let bodies: Vec<_> = page.items.iter().map(|c| c.comment.body().to_string()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(page.pagination.pages(), 2);
        assert_eq!(page.items[0].author.username, "alice");
        assert_eq!(page.items[0].post_title, "Post");

        let recent = repo.list_recent(1, 10).await.unwrap();
        assert_eq!(recent.items[0].comment.body(), "third");
    }

    #[tokio::test]
    async fn test_moderation() {
        let (repo, user_id, post_id) = setup().await;
        let id = repo
            .create(&Comment::new(user_id, post_id, "spam").unwrap())
            .await
            .unwrap();

        repo.set_disabled(id, true).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().unwrap().disabled);
        repo.set_disabled(id, false).await.unwrap();
        assert!(!repo.find_by_id(id).await.unwrap().unwrap().disabled);

        repo.delete(id).await.unwrap();
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(repo.set_disabled(id, true).await.is_err());
    }
}
