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

//! Random development data.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use inkwell_core::models::{permission::RoleName, post::Post, user::User};
use inkwell_db::repositories::{PostRepository, UserRepository};
use rand::{seq::SliceRandom, Rng};
use sqlx::SqlitePool;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
    "commodo", "consequat", "duis", "aute", "irure", "voluptate", "velit", "esse", "cillum",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Donald", "Edsger", "Frances", "Grace", "Ken", "Linus",
    "Margaret", "Niklaus", "Radia", "Tony", "Whitfield",
];

const LAST_NAMES: &[&str] = &[
    "Allen", "Dijkstra", "Hamilton", "Hopper", "Kay", "Knuth", "Lamport", "Liskov", "Lovelace",
    "Perlman", "Ritchie", "Shannon", "Thompson", "Turing", "Wirth",
];

const CITIES: &[&str] = &[
    "Amsterdam", "Berlin", "Chengdu", "Lisbon", "Montreal", "Nairobi", "Osaka", "Oslo", "Lima",
    "Seattle",
];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn sentence<R: Rng>(rng: &mut R) -> String {
    let count = rng.gen_range(4..12);
    let words: Vec<&str> = (0..count).map(|_| pick(rng, WORDS)).collect();
    format!("{}.", capitalize(&words.join(" ")))
}

pub fn sentences<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| sentence(rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A user with a random identity, joined some time in the last year.
/// Not saved.
pub fn user<R: Rng>(rng: &mut R) -> Result<User> {
    let first = pick(rng, FIRST_NAMES);
    let last = pick(rng, LAST_NAMES);
    let username = format!("{}{}", first.to_lowercase(), rng.gen_range(1..10_000));
    let email = format!(
        "{}.{}{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.gen_range(1..1_000),
        pick(rng, DOMAINS)
    );

    let mut user = User::new(email, username, pick(rng, WORDS))?;
    user.name = Some(format!("{} {}", first, last));
    user.location = Some(pick(rng, CITIES).to_string());
    user.about_me = Some(sentence(rng));
    user.member_since = Utc::now() - Duration::days(rng.gen_range(0..365));
    user.last_seen = user.member_since;
    Ok(user)
}

/// Insert `count` random users. Collisions with existing names are skipped,
/// so fewer may be created. Returns how many were.
pub async fn users(pool: &SqlitePool, count: usize) -> Result<usize> {
    let repo = UserRepository::new(pool.clone());
    let mut created = 0;

    for _ in 0..count {
        let user = user(&mut rand::thread_rng())?;
        if repo.email_taken(&user.email, None).await?
            || repo.username_taken(&user.username, None).await?
        {
            continue;
        }
        match repo.create(&user, &[RoleName::default_role()]).await {
            Ok(_) => created += 1,
            Err(e) => tracing::debug!("Skipping fake user {}: {:#}", user.username, e),
        }
    }

    Ok(created)
}

/// Insert `count` published posts by random existing users.
pub async fn posts(pool: &SqlitePool, count: usize) -> Result<usize> {
    let users = UserRepository::new(pool.clone());
    let posts = PostRepository::new(pool.clone());

    for _ in 0..count {
        let author_id = users
            .random_id()
            .await?
            .context("No users yet, run `inkwell fake users` first")?;

        let post = {
            let mut rng = rand::thread_rng();
            let title = sentence(&mut rng);
            let intro_len = rng.gen_range(1..3);
            let intro = sentences(&mut rng, intro_len);
            let body_len = rng.gen_range(1..6);
            let body = sentences(&mut rng, body_len);
            let mut post = Post::new(author_id, title, intro, &body)?;
            post.published = true;
            post.created_at = Utc::now() - Duration::days(rng.gen_range(0..365));
            post.updated_at = post.created_at;
            post
        };
        posts.create(&post).await?;
    }

    Ok(count)
}
