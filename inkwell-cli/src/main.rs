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

mod fake;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inkwell_core::models::{category::validate_label, permission::RoleName, user::User};
use inkwell_db::repositories::{
    CategoryRepository, FollowRepository, RoleRepository, SessionRepository, UserRepository,
};
use inkwell_web::{config::AdminConfig, templates::export_templates, Config};
use sqlx::SqlitePool;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inkwell")]
#[command(about = "Inkwell management tool")]
struct Cli {
    /// Database URL, overriding the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    Init {
        /// Also write the built-in templates to this directory for editing
        #[arg(long, value_name = "DIR")]
        export_templates: Option<PathBuf>,
    },

    /// Migrate, seed roles, create the admin account and add self-follows
    Deploy {
        /// Admin password, prompted for when the admin account is created
        #[arg(long)]
        password: Option<String>,
    },

    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Category management commands
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Generate random development data
    Fake {
        #[command(subcommand)]
        command: FakeCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a confirmed user
    Create {
        email: String,
        username: String,
        /// Roles to grant; defaults to `user`
        #[arg(long = "role")]
        roles: Vec<RoleName>,
        /// Prompted for when missing
        #[arg(long)]
        password: Option<String>,
    },

    /// Change a user's password and log out their sessions
    Password {
        /// Username or email
        user: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Grant a role
    Grant { user: String, role: RoleName },

    /// Revoke a role
    Revoke { user: String, role: RoleName },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create a category
    Create { name: String },
}

#[derive(Subcommand)]
enum FakeCommands {
    /// Random users; duplicates are skipped
    Users {
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
    /// Random published posts by existing users
    Posts {
        #[arg(long, default_value_t = 100)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell_cli=info,inkwell_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let database_url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| config.database_url.clone());

    match cli.command {
        Commands::Init { export_templates: dir } => {
            connect_database(&database_url).await?;
            println!("Database initialized successfully!");

            if let Some(dir) = dir {
                let written = export_templates(&dir)?;
                println!("Wrote {} template(s) to {}", written, dir.display());
            }
            Ok(())
        }

        Commands::Deploy { password } => {
            let pool = connect_database(&database_url).await?;
            deploy(&pool, &config.admin, password).await
        }

        Commands::User { command } => {
            let pool = connect_database(&database_url).await?;
            handle_user_command(command, pool).await
        }

        Commands::Category { command } => {
            let pool = connect_database(&database_url).await?;
            handle_category_command(command, pool).await
        }

        Commands::Fake { command } => {
            let pool = connect_database(&database_url).await?;
            match command {
                FakeCommands::Users { count } => {
                    let created = fake::users(&pool, count).await?;
                    println!("Created {} of {} fake users", created, count);
                }
                FakeCommands::Posts { count } => {
                    let created = fake::posts(&pool, count).await?;
                    println!("Created {} fake posts", created);
                }
            }
            Ok(())
        }
    }
}

async fn connect_database(database_url: &str) -> Result<SqlitePool> {
    // Runs migrations and seeds roles
    inkwell_db::init_database(database_url).await
}

fn prompt_password(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    rpassword::read_password().context("Failed to read password")
}

async fn find_user(repo: &UserRepository, login: &str) -> Result<User> {
    repo.find_by_login(login)
        .await?
        .ok_or_else(|| anyhow!("User not found: {}", login))
}

/// Safe to run repeatedly.
async fn deploy(pool: &SqlitePool, admin: &AdminConfig, password: Option<String>) -> Result<()> {
    RoleRepository::new(pool.clone()).ensure_defaults().await?;
    println!("Roles are up to date");

    let users = UserRepository::new(pool.clone());
    let admin_id = match users.find_by_email(&admin.email).await? {
        Some(user) => {
            let id = user.id.ok_or_else(|| anyhow!("User has no ID"))?;
            RoleRepository::new(pool.clone())
                .assign(id, RoleName::Admin)
                .await?;
            println!("Admin account {} already exists", user.username);
            id
        }
        None => {
            let password = match password {
                Some(p) => p,
                None => prompt_password("Admin password")?,
            };
            let mut user = User::new(admin.email.clone(), admin.username.clone(), &password)?;
            user.name = admin.name.clone();
            user.about_me = admin.about.clone();
            user.confirmed = true;

            let id = users
                .create(&user, &[RoleName::Admin])
                .await
                .context("Failed to create admin account")?;
            println!("Created admin account {} with ID {}", user.username, id);
            id
        }
    };
    tracing::debug!(admin_id, "Deploy checked admin account");

    let added = FollowRepository::new(pool.clone()).add_self_follows().await?;
    println!("Added {} self-follow(s)", added);
    Ok(())
}

async fn handle_user_command(command: UserCommands, pool: SqlitePool) -> Result<()> {
    let user_repo = UserRepository::new(pool.clone());
    let role_repo = RoleRepository::new(pool.clone());

    match command {
        UserCommands::Create {
            email,
            username,
            roles,
            password,
        } => {
            println!("Creating user: {} ({})", username, email);

            let password = match password {
                Some(p) => p,
                None => prompt_password("Password")?,
            };

            let mut user = User::new(email, username, &password)?;
            user.confirmed = true;
            if let Err(e) = user.is_valid() {
                anyhow::bail!("Invalid user data: {}", e);
            }
            if user_repo.email_taken(&user.email, None).await? {
                anyhow::bail!("Email already registered: {}", user.email);
            }
            if user_repo.username_taken(&user.username, None).await? {
                anyhow::bail!("Username already in use: {}", user.username);
            }

            let roles = if roles.is_empty() {
                vec![RoleName::default_role()]
            } else {
                roles
            };
            let user_id = user_repo
                .create(&user, &roles)
                .await
                .context("Failed to create user")?;

            FollowRepository::new(pool).follow(user_id, user_id).await?;

            println!("User created successfully with ID: {}", user_id);
            Ok(())
        }

        UserCommands::Password { user, password } => {
            println!("Changing password for {}", user);
            let found = find_user(&user_repo, &user).await?;
            let id = found.id.ok_or_else(|| anyhow!("User has no ID"))?;

            let password = match password {
                Some(p) => p,
                None => prompt_password("New password")?,
            };

            user_repo
                .update_password(id, &User::hash_password(&password)?)
                .await?;
            SessionRepository::new(pool).delete_for_user(id).await?;

            println!("Password changed successfully!");
            Ok(())
        }

        UserCommands::Grant { user, role } => {
            let found = find_user(&user_repo, &user).await?;
            let id = found.id.ok_or_else(|| anyhow!("User has no ID"))?;
            role_repo.assign(id, role).await?;
            println!("Granted {} to {}", role, found.username);
            Ok(())
        }

        UserCommands::Revoke { user, role } => {
            let found = find_user(&user_repo, &user).await?;
            let id = found.id.ok_or_else(|| anyhow!("User has no ID"))?;
            role_repo.revoke(id, role).await?;
            println!("Revoked {} from {}", role, found.username);
            Ok(())
        }
    }
}

async fn handle_category_command(command: CategoryCommands, pool: SqlitePool) -> Result<()> {
    match command {
        CategoryCommands::Create { name } => {
            let name = name.trim();
            validate_label(name).map_err(|e| anyhow!("Invalid category name: {}", e))?;

            let categories = CategoryRepository::new(pool);
            if categories.find_by_name(name).await?.is_some() {
                anyhow::bail!("Category already exists: {}", name);
            }
            let id = categories.create(name).await?;
            println!("Category '{}' created with ID {}", name, id);
            Ok(())
        }
    }
}
