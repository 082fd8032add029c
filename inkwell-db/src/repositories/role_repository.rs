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
use inkwell_core::models::permission::{Role, RoleName};
use sqlx::{SqliteConnection, SqlitePool};

pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert any missing role and refresh descriptions. Safe to run repeatedly.
    pub async fn ensure_defaults(&self) -> Result<()> {
        for role in RoleName::all() {
            sqlx::query(
                r#"
                INSERT INTO roles (name, description) VALUES (?, ?)
                ON CONFLICT(name) DO UPDATE SET description = excluded.description
                "#,
            )
            .bind(role.as_str())
            .bind(role.description())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to seed role {}", role))?;
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, description FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list roles")?;

        rows.into_iter()
            .map(|(id, name, description)| {
                Ok(Role {
                    id,
                    name: name.parse()?,
                    description,
                })
            })
            .collect()
    }

    pub async fn roles_for_user(&self, user_id: i64) -> Result<Vec<RoleName>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = ?
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load user roles")?;

        let mut roles = Vec::with_capacity(rows.len());
        for (name,) in rows {
            match name.parse() {
                Ok(role) => roles.push(role),
                Err(_) => tracing::warn!(role = %name, user_id, "Ignoring unknown role"),
            }
        }
        Ok(roles)
    }

    pub async fn assign(&self, user_id: i64, role: RoleName) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) \
             SELECT ?, id FROM roles WHERE name = ?",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to assign role")?;
        Ok(())
    }

    pub async fn revoke(&self, user_id: i64, role: RoleName) -> Result<()> {
        sqlx::query(
            "DELETE FROM user_roles WHERE user_id = ? \
             AND role_id = (SELECT id FROM roles WHERE name = ?)",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to revoke role")?;
        Ok(())
    }
}

/// Replace every role the user holds, on the caller's connection.
pub(crate) async fn replace_roles(
    conn: &mut SqliteConnection,
    user_id: i64,
    roles: &[RoleName],
) -> Result<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .context("Failed to clear roles")?;

    for role in roles {
        sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) \
             SELECT ?, id FROM roles WHERE name = ?",
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to assign role")?;
    }

    Ok(())
}
