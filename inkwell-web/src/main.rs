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

use anyhow::Result;
use chrono::Duration;
use inkwell_db::{init_database, SessionRepository};
use inkwell_web::{
    config::Config, mail::create_mailer, rate_limit::create_login_rate_limiter, routes,
    state::AppState, templates::init_templates,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    info!("Starting Inkwell web server");

    info!("Initializing database: {}", config.database_url);
    let db = init_database(&config.database_url).await?;

    let removed = SessionRepository::new(db.clone())
        .delete_expired(Duration::minutes(config.session.timeout_minutes))
        .await?;
    if removed > 0 {
        info!("Removed {} stale sessions", removed);
    }

    let templates = init_templates(&config)?;
    let mailer = create_mailer(&config.mail)?;
    if !config.mail.enabled {
        info!("Mail delivery disabled, messages will be logged");
    }

    let login_rate_limiter =
        create_login_rate_limiter(config.rate_limit.login_attempts_per_minute);

    let bind_addr = config.bind_addr();
    let state = AppState::new(db, templates, config, mailer, login_rate_limiter);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
