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
use chrono::Utc;
use inkwell_core::models::permission::RoleName;
use inkwell_core::models::user::User;
use sqlx::{SqliteConnection, SqlitePool};

use crate::datetime::parse_datetime;
use crate::repositories::role_repository::replace_roles;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    password_hash: String,
    name: Option<String>,
    location: Option<String>,
    about_me: Option<String>,
    avatar_hash: String,
    confirmed: bool,
    is_active: bool,
    member_since: String,
    last_seen: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: Some(row.id),
            email: row.email,
            username: row.username,
            password_hash: row.password_hash,
            name: row.name,
            location: row.location,
            about_me: row.about_me,
            avatar_hash: row.avatar_hash,
            confirmed: row.confirmed,
            is_active: row.is_active,
            member_since: parse_datetime(&row.member_since, "member_since")?,
            last_seen: parse_datetime(&row.last_seen, "last_seen")?,
        })
    }
}

const USER_COLUMNS: &str = "id, email, username, password_hash, name, location, about_me, \
     avatar_hash, confirmed, is_active, member_since, last_seen";

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the user, grant `roles` and add the self-follow, all or nothing.
    pub async fn create(&self, user: &User, roles: &[RoleName]) -> Result<i64> {
        if let Err(e) = user.is_valid() {
            return Err(anyhow!("Invalid user: {}", e));
        }

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, password_hash, name, location, about_me,
                               avatar_hash, confirmed, is_active, member_since, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.location)
        .bind(&user.about_me)
        .bind(&user.avatar_hash)
        .bind(user.confirmed)
        .bind(user.is_active)
        .bind(user.member_since)
        .bind(user.last_seen)
        .execute(&mut *tx)
        .await
        .context("Failed to create user")?;

        let user_id = result.last_insert_rowid();

        for role in roles {
            sqlx::query(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) \
                 SELECT ?, id FROM roles WHERE name = ?",
            )
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .context("Failed to assign role")?;
        }

        sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(user_id)
            .bind(user.member_since)
            .execute(&mut *tx)
            .await
            .context("Failed to add self follow")?;

        tx.commit().await.context("Failed to commit user creation")?;

        Ok(user_id)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find user by id")?;

        row.map(User::try_from).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    /// Accepts either a username or an email address.
    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        if login.contains('@') {
            self.find_by_email(login).await
        } else {
            self.find_by_username(login).await
        }
    }

    async fn find_one(&self, column: &'static str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to find user by {}", column))?;

        row.map(User::try_from).transpose()
    }

    pub async fn email_taken(&self, email: &str, except_id: Option<i64>) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(except_id.unwrap_or(-1))
                .fetch_one(&self.pool)
                .await
                .context("Failed to check email")?;
        Ok(count > 0)
    }

    pub async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(except_id.unwrap_or(-1))
                .fetch_one(&self.pool)
                .await
                .context("Failed to check username")?;
        Ok(count > 0)
    }

    pub async fn update(&self, user: &User) -> Result<()> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        update_user(&mut *conn, user).await
    }

    /// Save the account and replace its roles in one transaction.
    pub async fn update_with_roles(&self, user: &User, roles: &[RoleName]) -> Result<()> {
        let id = user
            .id
            .ok_or_else(|| anyhow!("Cannot update user without id"))?;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        update_user(&mut *tx, user).await?;
        replace_roles(&mut *tx, id, roles).await?;
        tx.commit().await.context("Failed to commit user update")?;
        Ok(())
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    pub async fn set_confirmed(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET confirmed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to confirm user")?;
        Ok(())
    }

    /// Refresh `last_seen` to now.
    pub async fn ping(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update last_seen")?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("User with id {} not found", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    pub async fn random_id(&self) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users ORDER BY RANDOM() LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to pick a random user")?;
        Ok(row.map(|(id,)| id))
    }
}

async fn update_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    let id = user
        .id
        .ok_or_else(|| anyhow!("Cannot update user without id"))?;

    if let Err(e) = user.is_valid() {
        return Err(anyhow!("Invalid user: {}", e));
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = ?, username = ?, password_hash = ?, name = ?, location = ?,
            about_me = ?, avatar_hash = ?, confirmed = ?, is_active = ?, last_seen = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(&user.location)
    .bind(&user.about_me)
    .bind(&user.avatar_hash)
    .bind(user.confirmed)
    .bind(user.is_active)
    .bind(user.last_seen)
    .bind(id)
    .execute(&mut *conn)
    .await
    .context("Failed to update user")?;

    if result.rows_affected() == 0 {
        return Err(anyhow!("User with id {} not found", id));
    }

    Ok(())
}
