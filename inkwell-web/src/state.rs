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

use inkwell_core::TokenSigner;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::autoreload_templates::TemplateEngine;
use crate::config::Config;
use crate::mail::Mailer;
use crate::rate_limit::SharedRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub templates: TemplateEngine,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: TokenSigner,
    pub login_rate_limiter: SharedRateLimiter,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        templates: TemplateEngine,
        config: Config,
        mailer: Arc<dyn Mailer>,
        login_rate_limiter: SharedRateLimiter,
    ) -> Self {
        let tokens = TokenSigner::new(&config.session.secret);
        Self {
            db,
            templates,
            config: Arc::new(config),
            mailer,
            tokens,
            login_rate_limiter,
        }
    }
}
