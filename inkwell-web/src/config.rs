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
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};

/// Application configuration.
///
/// Sources are merged in this order, later ones winning:
/// 1. Built-in defaults
/// 2. `/etc/inkwell.toml`
/// 3. `~/.inkwell.toml`
/// 4. `./inkwell.toml`
/// 5. `INKWELL_*` environment variables (`__` separates sections)
/// 6. `DATABASE_URL`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database_url: String,
    pub templates_dir: String,
    pub static_dir: String,
    pub development_mode: bool,
    pub slow_request_ms: u64,
    pub site_title: String,
    pub site_url: String,
    pub session: SessionConfig,
    pub mail: MailConfig,
    pub admin: AdminConfig,
    pub pagination: PaginationConfig,
    pub cdn: CdnConfig,
    pub rate_limit: RateLimitConfig,
    pub wake_on_lan: WakeOnLanConfig,
    pub security_headers: SecurityHeadersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub secure_cookies: bool,
    /// Signs confirmation and reset tokens.
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub subject_prefix: String,
}

/// The account `inkwell deploy` creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub about: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub posts_per_page: u32,
    pub followers_per_page: u32,
    pub comments_per_page: u32,
    /// Answer 404 for pages past the end instead of an empty page.
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    pub enabled: bool,
    pub domain: String,
    pub https: bool,
    pub public_domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub login_attempts_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeOnLanConfig {
    pub broadcast_ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    pub enabled: bool,
    pub csp: Option<String>,
    pub frame_options: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database_url: default_database_url(),
            templates_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            development_mode: false,
            slow_request_ms: 500,
            site_title: "Inkwell".to_string(),
            site_url: "http://localhost:3000".to_string(),
            session: SessionConfig::default(),
            mail: MailConfig::default(),
            admin: AdminConfig::default(),
            pagination: PaginationConfig::default(),
            cdn: CdnConfig::default(),
            rate_limit: RateLimitConfig::default(),
            wake_on_lan: WakeOnLanConfig::default(),
            security_headers: SecurityHeadersConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 1440,
            secure_cookies: false,
            // Random per process unless configured, so tokens die with a restart.
            secret: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "localhost".to_string(),
            port: 465,
            use_tls: true,
            username: String::new(),
            password: String::new(),
            sender: "Inkwell <noreply@localhost>".to_string(),
            subject_prefix: "[Inkwell]".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: "admin@example.com".to_string(),
            username: "admin".to_string(),
            name: None,
            about: None,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            followers_per_page: 20,
            comments_per_page: 10,
            strict: false,
        }
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            domain: String::new(),
            https: true,
            public_domain: "cdn.jsdelivr.net/npm".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_attempts_per_minute: 5,
        }
    }
}

impl Default for WakeOnLanConfig {
    fn default() -> Self {
        Self {
            broadcast_ip: "255.255.255.255".to_string(),
            port: 9,
        }
    }
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csp: Some(default_csp()),
            frame_options: Some("DENY".to_string()),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:inkwell.db".to_string()
}

fn default_csp() -> String {
    "default-src 'self'; script-src 'self' 'unsafe-inline' https:; \
     style-src 'self' 'unsafe-inline' https:; img-src 'self' data: https:; \
     font-src 'self' https:; frame-ancestors 'none'; base-uri 'self'; form-action 'self';"
        .to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().context("Failed to load configuration")
    }

    /// The full provider chain, exposed so tests can layer on top of it.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("/etc/inkwell.toml"));

        if let Some(home) = env::var_os("HOME") {
            figment = figment.merge(Toml::file(PathBuf::from(home).join(".inkwell.toml")));
        }

        figment
            .merge(Toml::file("inkwell.toml"))
            .merge(Env::prefixed("INKWELL_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }

    /// Absolute URL for `path`, used in emails.
    pub fn external_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), path)
    }
}
