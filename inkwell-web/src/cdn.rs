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

//! Static asset URLs, optionally served from a CDN.

use serde_json::Value;
use std::collections::HashMap;
use tera::{to_value, Function};

use crate::config::CdnConfig;

/// Maps `static/` relative paths to their public URL.
#[derive(Debug, Clone)]
pub struct StaticUrl {
    base: String,
}

impl StaticUrl {
    pub fn new(cdn: &CdnConfig) -> Self {
        let base = if cdn.enabled && !cdn.domain.is_empty() {
            format!("{}://{}/static", scheme(cdn.https), cdn.domain.trim_end_matches('/'))
        } else {
            "/static".to_string()
        };
        Self { base }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl Function for StaticUrl {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let path = required_path(args, "static_url")?;
        Ok(to_value(self.url(path))?)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Shared third-party libraries (CSS frameworks, JS) from a public CDN.
#[derive(Debug, Clone)]
pub struct PublicCdn {
    base: String,
}

impl PublicCdn {
    pub fn new(cdn: &CdnConfig) -> Self {
        Self {
            base: format!("https://{}", cdn.public_domain.trim_end_matches('/')),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

impl Function for PublicCdn {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let path = required_path(args, "public_cdn")?;
        Ok(to_value(self.url(path))?)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn scheme(https: bool) -> &'static str {
    if https {
        "https"
    } else {
        "http"
    }
}

fn required_path<'a>(args: &'a HashMap<String, Value>, function: &str) -> tera::Result<&'a str> {
    args.get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{} requires a `path` argument", function)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn(enabled: bool, https: bool) -> CdnConfig {
        CdnConfig {
            enabled,
            domain: "cdn.example.com/assets/".to_string(),
            https,
            public_domain: "libs.example.com".to_string(),
        }
    }

    #[test]
    fn test_local_static_urls_when_disabled() {
        let urls = StaticUrl::new(&cdn(false, true));
        assert_eq!(urls.url("css/site.css"), "/static/css/site.css");
        assert_eq!(urls.url("/favicon.ico"), "/static/favicon.ico");
    }

    #[test]
    fn test_cdn_static_urls() {
        assert_eq!(
            StaticUrl::new(&cdn(true, true)).url("css/site.css"),
            "https://cdn.example.com/assets/static/css/site.css"
        );
        assert_eq!(
            StaticUrl::new(&cdn(true, false)).url("js/app.js"),
            "http://cdn.example.com/assets/static/js/app.js"
        );
    }

    #[test]
    fn test_enabled_without_domain_stays_local() {
        let mut config = cdn(true, true);
        config.domain.clear();
        assert_eq!(StaticUrl::new(&config).url("a.css"), "/static/a.css");
    }

    #[test]
    fn test_tera_function_requires_path() {
        let urls = StaticUrl::new(&cdn(false, true));
        assert!(urls.call(&HashMap::new()).is_err());

        let mut args = HashMap::new();
        args.insert("path".to_string(), Value::String("x.js".to_string()));
        assert_eq!(urls.call(&args).unwrap(), Value::String("/static/x.js".to_string()));
    }

    #[test]
    fn test_public_cdn() {
        let libs = PublicCdn::new(&cdn(false, true));
        assert_eq!(
            libs.url("bootstrap@5.3.3/dist/css/bootstrap.min.css"),
            "https://libs.example.com/bootstrap@5.3.3/dist/css/bootstrap.min.css"
        );
    }
}
