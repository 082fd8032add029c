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

use anyhow::{anyhow, Context as _, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tera::{to_value, Context, Tera};

use crate::cdn::{PublicCdn, StaticUrl};
use crate::config::CdnConfig;
use crate::templates::EMBEDDED_TEMPLATES;

/// How a Tera instance is assembled: embedded templates, overridden by any
/// file of the same name under `templates_dir`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    templates_dir: String,
    cdn: CdnConfig,
}

/// A wrapper around Tera that can reload templates in development mode
#[derive(Clone)]
pub enum TemplateEngine {
    /// Templates loaded once at startup
    Static(Arc<Tera>),
    /// Rebuilt from disk on every render
    Reloadable {
        source: TemplateSource,
        cached: Arc<RwLock<Tera>>,
    },
}

impl TemplateEngine {
    pub fn new(templates_dir: &str, development_mode: bool, cdn: &CdnConfig) -> Result<Self> {
        let source = TemplateSource {
            templates_dir: templates_dir.to_string(),
            cdn: cdn.clone(),
        };
        let tera = source.build()?;

        if development_mode {
            tracing::info!("Template hot reload enabled (development mode)");
            Ok(Self::Reloadable {
                source,
                cached: Arc::new(RwLock::new(tera)),
            })
        } else {
            tracing::info!("Templates loaded once (production mode)");
            Ok(Self::Static(Arc::new(tera)))
        }
    }

    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        match self {
            Self::Static(tera) => tera
                .render(template_name, context)
                .with_context(|| format!("Failed to render {}", template_name)),
            Self::Reloadable { source, cached } => {
                match source.build() {
                    Ok(fresh) => {
                        let mut guard = cached
                            .write()
                            .map_err(|_| anyhow!("Template cache lock poisoned"))?;
                        *guard = fresh;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to reload templates: {:#}. Using cached version.", e);
                    }
                }
                let guard = cached
                    .read()
                    .map_err(|_| anyhow!("Template cache lock poisoned"))?;
                guard
                    .render(template_name, context)
                    .with_context(|| format!("Failed to render {}", template_name))
            }
        }
    }

    pub fn has_template(&self, template_name: &str) -> bool {
        match self {
            Self::Static(tera) => tera.get_template_names().any(|name| name == template_name),
            Self::Reloadable { cached, .. } => cached
                .read()
                .map(|tera| tera.get_template_names().any(|name| name == template_name))
                .unwrap_or(false),
        }
    }
}

impl TemplateSource {
    fn build(&self) -> Result<Tera> {
        let mut embedded = Tera::default();
        embedded
            .add_raw_templates(EMBEDDED_TEMPLATES.iter().copied())
            .context("Failed to parse embedded templates")?;

        let mut tera = if Path::new(&self.templates_dir).is_dir() {
            let pattern = format!("{}/**/*", self.templates_dir.trim_end_matches('/'));
            let mut disk = Tera::new(&pattern)
                .with_context(|| format!("Failed to load templates from {}", self.templates_dir))?;
            // Files on disk win over embedded templates with the same name.
            disk.extend(&embedded)
                .context("Failed to merge embedded templates")?;
            disk
        } else {
            embedded
        };

        tera.register_function("static_url", StaticUrl::new(&self.cdn));
        tera.register_function("public_cdn", PublicCdn::new(&self.cdn));
        tera.register_filter("gravatar", gravatar_filter);

        Ok(tera)
    }
}

/// `{{ author.avatar_hash | gravatar(size=40) }}`
fn gravatar_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let hash = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("gravatar filter expects an avatar hash"))?;
    let size = args.get("size").and_then(Value::as_u64).unwrap_or(40) as u32;
    Ok(to_value(inkwell_core::gravatar_url(hash, size))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_templates_render_without_a_directory() {
        let engine = TemplateEngine::new("/nonexistent/inkwell", false, &CdnConfig::default()).unwrap();
        assert!(engine.has_template("base.html"));
        assert!(engine.has_template("wechat/wechat.html"));
        assert!(!engine.has_template("wechat/missing.html"));
    }

    #[test]
    fn test_disk_template_overrides_embedded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("wechat")).unwrap();
        fs::write(dir.path().join("wechat/wechat.html"), "custom {{ site_title }}").unwrap();
        fs::write(dir.path().join("wechat/extra.html"), "extra page").unwrap();

        let engine = TemplateEngine::new(dir.path().to_str().unwrap(), false, &CdnConfig::default())
            .unwrap();

        let mut context = Context::new();
        context.insert("site_title", "Ink");
        assert_eq!(engine.render("wechat/wechat.html", &context).unwrap(), "custom Ink");
        assert!(engine.has_template("wechat/extra.html"));
        assert!(engine.has_template("base.html"));
    }

    #[test]
    fn test_reloadable_engine_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        fs::write(&path, "one").unwrap();

        let engine = TemplateEngine::new(dir.path().to_str().unwrap(), true, &CdnConfig::default())
            .unwrap();
        assert_eq!(engine.render("hello.txt", &Context::new()).unwrap(), "one");

        fs::write(&path, "two").unwrap();
        assert_eq!(engine.render("hello.txt", &Context::new()).unwrap(), "two");
    }

    #[test]
    fn test_gravatar_filter() {
        let mut args = HashMap::new();
        args.insert("size".to_string(), Value::from(64));
        let url = gravatar_filter(&Value::from("abc"), &args).unwrap();
        assert_eq!(
            url,
            Value::from("https://secure.gravatar.com/avatar/abc?s=64&d=identicon&r=g")
        );
        assert!(gravatar_filter(&Value::from(3), &HashMap::new()).is_err());
    }
}
