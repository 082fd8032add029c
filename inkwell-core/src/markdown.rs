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

//! Markdown to sanitized HTML.
//!
//! Rendering runs in three steps: parse with pulldown-cmark, turn bare
//! `http(s)://` URLs in text into links, then clean the HTML with ammonia
//! against a per-content allow-list.

use once_cell::sync::Lazy;
use pulldown_cmark::{
    html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use regex::Regex;
use std::collections::{HashMap, HashSet};

static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("Failed to compile URL regex"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\''];

const POST_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "code", "em", "i", "li", "ol", "pre", "strong",
    "ul", "h1", "h2", "h3", "h4", "p", "q", "img", "hr", "sub", "sup", "del", "dl", "dt", "dd",
];

const COMMENT_TAGS: &[&str] = &[
    "p", "a", "abbr", "acronym", "b", "code", "em", "i", "strong", "h3", "h4", "li", "ol", "ul",
    "blockquote", "pre", "hr", "img", "sub", "sup",
];

/// Which set of tags survives sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowList {
    /// Article bodies: headings, definition lists, quotes.
    Post,
    /// Comments: a narrower set without top-level headings.
    Comment,
}

impl AllowList {
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            AllowList::Post => POST_TAGS,
            AllowList::Comment => COMMENT_TAGS,
        }
    }
}

pub fn render_post(source: &str) -> String {
    render(source, AllowList::Post)
}

pub fn render_comment(source: &str) -> String {
    render(source, AllowList::Comment)
}

/// Render Markdown and sanitize the result.
pub fn render(source: &str, allow: AllowList) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = TextMergeStream::new(Parser::new_ext(source, options));
    let events = linkify(parser);

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    sanitize(&html_output, allow)
}

/// Clean already-rendered HTML against an allow-list.
pub fn sanitize(html: &str, allow: AllowList) -> String {
    let tags: HashSet<&str> = allow.tags().iter().copied().collect();

    let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    tag_attributes.insert("a", ["href"].into_iter().collect());
    tag_attributes.insert("img", ["src", "alt"].into_iter().collect());

    ammonia::Builder::default()
        .tags(tags)
        .generic_attributes(["class"].into_iter().collect())
        .tag_attributes(tag_attributes)
        .link_rel(Some("nofollow"))
        .clean(html)
        .to_string()
}

fn linkify<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in events {
        match event {
            Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                link_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push(event);
            }
            Event::Text(text) if link_depth == 0 && !in_code_block => {
                split_urls(&text, &mut out);
            }
            other => out.push(other),
        }
    }

    out
}

fn split_urls<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut last = 0;

    for found in URL_REGEX.find_iter(text) {
        let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url.len() <= "https://".len() {
            continue;
        }
        let start = found.start();
        let end = start + url.len();

        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = end;
    }

    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = render_post("# Hello\n\nThis is a **test**.");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<strong>test</strong>"));
    }

    #[test]
    fn test_strikethrough() {
        let html = render_post("This is ~~deleted~~ text.");
        assert!(html.contains("<del>deleted</del>"));
    }

    #[test]
    fn test_script_removed_with_content() {
        let html = render_post("Hello <script>alert('xss')</script> world!");
        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("Hello"));
    }

    #[test]
    fn test_disallowed_tags_stripped_text_kept() {
        let html = render_post("<iframe src=\"https://evil.test\"></iframe><span>kept</span>");
        assert!(!html.contains("<iframe"));
        assert!(!html.contains("<span"));
        assert!(html.contains("kept"));
    }

    #[test]
    fn test_tables_not_allowed() {
        let html = render_post("| A | B |\n|---|---|\n| 1 | 2 |");
        assert!(!html.contains("<table"));
        assert!(!html.contains("<td"));
    }

    #[test]
    fn test_comment_list_is_narrower() {
        let source = "# Big heading\n\n<q>quote</q>";
        let post = render_post(source);
        let comment = render_comment(source);

        assert!(post.contains("<h1>"));
        assert!(post.contains("<q>"));
        assert!(!comment.contains("<h1>"));
        assert!(!comment.contains("<q>"));
        assert!(comment.contains("Big heading"));
    }

    #[test]
    fn test_event_handlers_removed() {
        let html = render_comment("<img src=\"/a.png\" alt=\"a\" onerror=\"alert(1)\">");
        assert!(html.contains("<img"));
        assert!(html.contains("src=\"/a.png\""));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn test_javascript_urls_removed() {
        let html = render_comment("[click](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_links_get_nofollow() {
        let html = render_post("[Click here](https://example.com)");
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("rel=\"nofollow\""));
        assert!(html.contains("Click here</a>"));
    }

    #[test]
    fn test_bare_urls_are_linked() {
        let html = render_comment("See https://example.com/docs. Thanks");
        assert!(html.contains("href=\"https://example.com/docs\""));
        assert!(html.contains(">https://example.com/docs</a>. Thanks"));
    }

    #[test]
    fn test_urls_in_code_are_not_linked() {
        let html = render_post("```\nhttps://example.com\n```\n\n`http://inline.test`");
        assert!(!html.contains("<a"));
        assert!(html.contains("https://example.com"));
    }

    #[test]
    fn test_existing_links_not_nested() {
        let html = render_post("[https://example.com](https://example.com)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_class_attribute_kept() {
        let html = render_post("<p class=\"lead\">Intro</p>");
        assert!(html.contains("class=\"lead\""));
    }

    #[test]
    fn test_render_is_deterministic() {
        let source = "Some *text* with http://a.test and <b>bold</b>";
        assert_eq!(render_comment(source), render_comment(source));
    }
}
