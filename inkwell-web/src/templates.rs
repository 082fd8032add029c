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
use std::path::Path;

use crate::autoreload_templates::TemplateEngine;
use crate::config::Config;

macro_rules! embed {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../templates/", $name)))),*]
    };
}

/// Templates compiled into the binary. A file with the same name under
/// `templates_dir` takes precedence.
pub const EMBEDDED_TEMPLATES: &[(&str, &str)] = embed![
    "base.html",
    "macros.html",
    "_posts.html",
    "_sidebar.html",
    "index.html",
    "listing.html",
    "post.html",
    "post_edit.html",
    "user.html",
    "edit_profile.html",
    "edit_profile_admin.html",
    "followers.html",
    "moderate.html",
    "categories.html",
    "error.html",
    "auth/login.html",
    "auth/register.html",
    "auth/change_password.html",
    "auth/reset_request.html",
    "auth/reset_password.html",
    "auth/unconfirmed.html",
    "email/confirm.txt",
    "email/confirm.html",
    "email/reset_password.txt",
    "email/reset_password.html",
    "wechat/wechat.html",
    "wechat/control-pc.html",
];

pub fn init_templates(config: &Config) -> Result<TemplateEngine> {
    let overrides = Path::new(&config.templates_dir);
    if overrides.is_dir() {
        tracing::info!("Template overrides loaded from {}", overrides.display());
    } else {
        tracing::debug!(
            "No template directory at {}, using embedded templates",
            overrides.display()
        );
    }

    TemplateEngine::new(&config.templates_dir, config.development_mode, &config.cdn)
        .context("Failed to initialise templates")
}

/// Write the embedded templates to `dir`, skipping files that already exist.
/// Returns how many were written.
pub fn export_templates(dir: &Path) -> Result<usize> {
    let mut written = 0;
    for (name, content) in EMBEDDED_TEMPLATES {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CdnConfig;
    use inkwell_core::models::user::User;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn engine() -> TemplateEngine {
        TemplateEngine::new("/nonexistent/inkwell", false, &CdnConfig::default()).unwrap()
    }

    fn email_context(key: &str, url: &str) -> tera::Context {
        let user = User::new("ada@example.com".into(), "ada".into(), "pw").unwrap();
        let mut context = tera::Context::new();
        context.insert("site_title", "Inkwell");
        context.insert("user", &user);
        context.insert(key, url);
        context
    }

    #[test]
    fn test_every_embedded_template_parses() {
        let engine = engine();
        for (name, _) in EMBEDDED_TEMPLATES {
            assert!(engine.has_template(name), "{} missing", name);
        }
    }

    #[test]
    fn test_confirm_email_contains_link() {
        let engine = engine();
        let context = email_context("confirm_url", "http://localhost:3000/blog/confirm/abc");

        let text = engine.render("email/confirm.txt", &context).unwrap();
        assert!(text.contains("Dear ada,"));
        assert!(text.contains("http://localhost:3000/blog/confirm/abc"));

        let html = engine.render("email/confirm.html", &context).unwrap();
        assert!(html.contains("href=\"http://localhost:3000/blog/confirm/abc\""));
    }

    #[test]
    fn test_reset_email_contains_link() {
        let engine = engine();
        let context = email_context("reset_url", "http://localhost:3000/blog/reset/xyz");
        let text = engine.render("email/reset_password.txt", &context).unwrap();
        assert!(text.contains("http://localhost:3000/blog/reset/xyz"));
    }

    #[test]
    fn test_export_templates_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("base.html"), "mine").unwrap();

        let written = export_templates(dir.path()).unwrap();
        assert_eq!(written, EMBEDDED_TEMPLATES.len() - 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("base.html")).unwrap(), "mine");
        assert!(dir.path().join("wechat/control-pc.html").is_file());
    }
}
