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

//! Configuration loading through the full provider chain: defaults,
//! TOML files and environment variables.

use figment::providers::{Format, Toml};
use inkwell_web::Config;
use serial_test::serial;
use std::{env, fs};
use tempfile::TempDir;

/// Clears the given variables and restores them on drop.
struct EnvGuard {
    saved_vars: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn new(vars: &[&str]) -> Self {
        let saved_vars = vars
            .iter()
            .map(|var| (var.to_string(), env::var(var).ok()))
            .collect();

        for var in vars {
            env::remove_var(var);
        }

        Self { saved_vars }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (var, value) in &self.saved_vars {
            match value {
                Some(val) => env::set_var(var, val),
                None => env::remove_var(var),
            }
        }
    }
}

const VARS: &[&str] = &[
    "DATABASE_URL",
    "INKWELL_SITE_TITLE",
    "INKWELL_SERVER__PORT",
    "INKWELL_PAGINATION__STRICT",
    "INKWELL_PAGINATION__POSTS_PER_PAGE",
    "INKWELL_MAIL__ENABLED",
    "INKWELL_WAKE_ON_LAN__BROADCAST_IP",
];

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    let _guard = EnvGuard::new(VARS);
    env::set_var("INKWELL_SITE_TITLE", "Field Notes");
    env::set_var("INKWELL_SERVER__PORT", "9000");
    env::set_var("INKWELL_PAGINATION__STRICT", "true");
    env::set_var("INKWELL_WAKE_ON_LAN__BROADCAST_IP", "192.168.1.255");

    let config = Config::load().unwrap();
    assert_eq!(config.site_title, "Field Notes");
    assert_eq!(config.server.port, 9000);
    assert!(config.pagination.strict);
    assert_eq!(config.pagination.posts_per_page, 10);
    assert_eq!(config.wake_on_lan.broadcast_ip, "192.168.1.255");
    assert_eq!(config.wake_on_lan.port, 9);
}

#[test]
#[serial]
fn test_database_url_variable() {
    let _guard = EnvGuard::new(VARS);
    env::set_var("DATABASE_URL", "sqlite:/tmp/inkwell-test.db");

    let config = Config::load().unwrap();
    assert_eq!(config.database_url, "sqlite:/tmp/inkwell-test.db");
}

#[test]
#[serial]
fn test_invalid_environment_value_is_reported() {
    let _guard = EnvGuard::new(VARS);
    env::set_var("INKWELL_PAGINATION__POSTS_PER_PAGE", "lots");

    assert!(Config::load().is_err());
}

#[test]
#[serial]
fn test_file_layer_is_merged_over_defaults() {
    let _guard = EnvGuard::new(VARS);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inkwell.toml");
    fs::write(
        &path,
        r#"
        site_url = "https://notes.example.com"

        [admin]
        email = "owner@example.com"
        username = "owner"

        [mail]
        enabled = true
        server = "smtp.example.com"
        port = 587
        use_tls = false
        "#,
    )
    .unwrap();

    let config = Config::from_figment(Config::figment().merge(Toml::file(&path))).unwrap();
    assert_eq!(config.site_url, "https://notes.example.com");
    assert_eq!(config.admin.email, "owner@example.com");
    assert_eq!(config.admin.username, "owner");
    assert!(config.mail.enabled);
    assert_eq!(config.mail.server, "smtp.example.com");
    assert_eq!(config.mail.port, 587);
    assert_eq!(config.mail.subject_prefix, "[Inkwell]");
    assert_eq!(
        config.external_url("/blog/reset/t"),
        "https://notes.example.com/blog/reset/t"
    );
}

#[test]
#[serial]
fn test_missing_file_is_ignored() {
    let _guard = EnvGuard::new(VARS);
    let config = Config::from_figment(
        Config::figment().merge(Toml::file("/nonexistent/inkwell/inkwell.toml")),
    )
    .unwrap();
    assert_eq!(config.site_title, "Inkwell");
}
