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
use inkwell_core::models::category::{validate_label, Category};
use sqlx::SqlitePool;

pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str) -> Result<i64> {
        validate_label(name).map_err(|e| anyhow!("Invalid category: {}", e))?;

        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name.trim())
            .execute(&self.pool)
            .await
            .context("Failed to create category")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;

        Ok(rows.into_iter().map(|(id, name)| Category { id, name }).collect())
    }

    /// Categories with their published post counts.
    pub async fn list_with_counts(&self) -> Result<Vec<(Category, i64)>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            r#"
            SELECT c.id, c.name,
                   (SELECT COUNT(*) FROM posts p WHERE p.category_id = c.id AND p.published = 1)
            FROM categories c
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        Ok(rows
            .into_iter()
            .map(|(id, name, count)| (Category { id, name }, count))
            .collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find category")?;
        Ok(row.map(|(id, name)| Category { id, name }))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM categories WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to find category")?;
        Ok(row.map(|(id, name)| Category { id, name }))
    }

    /// Posts in the category keep existing with no category.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Category with id {} not found", id));
        }
        Ok(())
    }
}
