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
use chrono::Utc;
use inkwell_core::models::follow::FollowEntry;
use inkwell_core::models::post::AuthorInfo;
use inkwell_core::pagination::{Page, Pagination};
use sqlx::SqlitePool;

use crate::datetime::parse_datetime;

/// The follow graph. Every user follows themself so their own posts show up
/// in their feed; counts and lists leave that edge out.
pub struct FollowRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    username: String,
    name: Option<String>,
    avatar_hash: String,
    created_at: String,
}

impl TryFrom<EntryRow> for FollowEntry {
    type Error = anyhow::Error;

    fn try_from(row: EntryRow) -> Result<Self> {
        Ok(FollowEntry {
            user: AuthorInfo {
                id: row.id,
                username: row.username,
                name: row.name,
                avatar_hash: row.avatar_hash,
            },
            since: parse_datetime(&row.created_at, "created_at")?,
        })
    }
}

impl FollowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns false when the edge already existed.
    pub async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to follow user")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&self.pool)
            .await
            .context("Failed to unfollow user")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM follows WHERE follower_id = ? AND followed_id = ?")
                .bind(follower_id)
                .bind(followed_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to check follow")?;
        Ok(row.is_some())
    }

    pub async fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.is_following(other_id, user_id).await
    }

    pub async fn follower_count(&self, user_id: i64) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows WHERE followed_id = ? AND follower_id != followed_id",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count followers")?;
        Ok(count.max(0) as u64)
    }

    pub async fn following_count(&self, user_id: i64) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND follower_id != followed_id",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count followed users")?;
        Ok(count.max(0) as u64)
    }

    pub async fn followers(&self, user_id: i64, page: u32, per_page: u32) -> Result<Page<FollowEntry>> {
        let total = self.follower_count(user_id).await?;
        let pagination = Pagination::new(page, per_page, total);

        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT u.id, u.username, u.name, u.avatar_hash, f.created_at
            FROM follows f
            JOIN users u ON u.id = f.follower_id
            WHERE f.followed_id = ? AND f.follower_id != f.followed_id
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list followers")?;

        let items = rows
            .into_iter()
            .map(FollowEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, pagination))
    }

    pub async fn following(&self, user_id: i64, page: u32, per_page: u32) -> Result<Page<FollowEntry>> {
        let total = self.following_count(user_id).await?;
        let pagination = Pagination::new(page, per_page, total);

        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT u.id, u.username, u.name, u.avatar_hash, f.created_at
            FROM follows f
            JOIN users u ON u.id = f.followed_id
            WHERE f.follower_id = ? AND f.follower_id != f.followed_id
            ORDER BY f.created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list followed users")?;

        let items = rows
            .into_iter()
            .map(FollowEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, pagination))
    }

    /// Add the self-follow to every user missing one. Returns how many were added.
    pub async fn add_self_follows(&self) -> Result<u64> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) \
             SELECT id, id, ? FROM users",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to add self follows")?;

        Ok(result.rows_affected())
    }
}
