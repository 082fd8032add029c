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
use inkwell_core::models::home_page::HomePage;
use sqlx::SqlitePool;

pub struct HomePageRepository {
    pool: SqlitePool,
}

impl HomePageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<HomePage> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT view_times FROM home_pages WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load home page counter")?;

        Ok(HomePage {
            view_times: row.map(|(n,)| n).unwrap_or(0),
        })
    }

    /// Count one home page view and return the new total.
    pub async fn increment(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO home_pages (id, view_times) VALUES (1, 1)
            ON CONFLICT(id) DO UPDATE SET view_times = view_times + 1
            RETURNING view_times
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to increment home page counter")?;

        Ok(count)
    }
}
