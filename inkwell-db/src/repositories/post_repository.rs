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

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use inkwell_core::models::category::{Category, Tag};
use inkwell_core::models::post::{AuthorInfo, Post, PostSummary, StoredPost};
use inkwell_core::pagination::{Page, Pagination};
use sqlx::{SqliteConnection, SqlitePool};

use crate::datetime::parse_datetime;
use crate::repositories::tag_repository::replace_post_tags;

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Every published post.
    Published,
    /// One author's posts. Drafts are included for the author and moderators.
    Author { id: i64, include_drafts: bool },
    Category(i64),
    Tag(i64),
    /// Published posts by anyone the given user follows.
    FollowedBy(i64),
}

impl PostFilter {
    fn clause(&self) -> (&'static str, Option<i64>) {
        match *self {
            PostFilter::Published => ("p.published = 1", None),
            PostFilter::Author {
                id,
                include_drafts: true,
            } => ("p.author_id = ?", Some(id)),
            PostFilter::Author {
                id,
                include_drafts: false,
            } => ("p.author_id = ? AND p.published = 1", Some(id)),
            PostFilter::Category(id) => ("p.category_id = ? AND p.published = 1", Some(id)),
            PostFilter::Tag(id) => (
                "p.published = 1 AND p.id IN (SELECT post_id FROM post_tags WHERE tag_id = ?)",
                Some(id),
            ),
            PostFilter::FollowedBy(id) => (
                "p.published = 1 AND p.author_id IN (SELECT followed_id FROM follows WHERE follower_id = ?)",
                Some(id),
            ),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    intro: String,
    body: String,
    body_html: String,
    published: bool,
    view_times: i64,
    author_id: i64,
    category_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post::from_stored(StoredPost {
            id: row.id,
            title: row.title,
            intro: row.intro,
            body: row.body,
            body_html: row.body_html,
            published: row.published,
            view_times: row.view_times,
            author_id: row.author_id,
            category_id: row.category_id,
            created_at: parse_datetime(&row.created_at, "created_at")?,
            updated_at: parse_datetime(&row.updated_at, "updated_at")?,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    post: PostRow,
    author_username: String,
    author_name: Option<String>,
    author_avatar_hash: String,
    category_name: Option<String>,
    comment_count: i64,
}

impl TryFrom<SummaryRow> for PostSummary {
    type Error = anyhow::Error;

    fn try_from(row: SummaryRow) -> Result<Self> {
        let author = AuthorInfo {
            id: row.post.author_id,
            username: row.author_username,
            name: row.author_name,
            avatar_hash: row.author_avatar_hash,
        };
        let category = match (row.post.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category { id, name }),
            _ => None,
        };
        let post = Post::try_from(row.post)?;
        Ok(PostSummary::new(post, author, category, row.comment_count))
    }
}

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.intro, p.body, p.body_html, p.published, p.view_times,
           p.author_id, p.category_id, p.created_at, p.updated_at,
           u.username AS author_username, u.name AS author_name,
           u.avatar_hash AS author_avatar_hash,
           c.name AS category_name,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, post: &Post) -> Result<i64> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        insert_post(&mut *conn, post).await
    }

    /// Insert the post and its tags in one transaction.
    pub async fn create_with_tags(&self, post: &Post, tags: &[String]) -> Result<i64> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let id = insert_post(&mut *tx, post).await?;
        replace_post_tags(&mut *tx, id, tags).await?;
        tx.commit().await.context("Failed to commit post")?;
        Ok(id)
    }

    /// Save edits and replace the tags, all or nothing. The view counter is
    /// left alone so concurrent views are not lost.
    pub async fn update_with_tags(&self, post: &Post, tags: &[String]) -> Result<()> {
        let id = post
            .id
            .ok_or_else(|| anyhow!("Cannot update post without id"))?;
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        update_post(&mut *tx, post).await?;
        replace_post_tags(&mut *tx, id, tags).await?;
        tx.commit().await.context("Failed to commit post")?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Post with id {} not found", id));
        }

        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, intro, body, body_html, published, view_times,
                   author_id, category_id, created_at, updated_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find post by id")?;

        row.map(Post::try_from).transpose()
    }

    /// A single post with author, category and tags.
    pub async fn find_summary(&self, id: i64) -> Result<Option<PostSummary>> {
        let sql = format!("{} WHERE p.id = ?", SUMMARY_SELECT);
        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load post")?;

        match row {
            Some(row) => {
                let mut summary = PostSummary::try_from(row)?;
                summary.tags = self.tags_for_post(id).await?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    pub async fn count(&self, filter: PostFilter) -> Result<u64> {
        let (clause, bind) = filter.clause();
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", clause);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        Ok(count.max(0) as u64)
    }

    /// Newest first. Pages past the end come back empty.
    pub async fn list(&self, filter: PostFilter, page: u32, per_page: u32) -> Result<Page<PostSummary>> {
        let total = self.count(filter).await?;
        let pagination = Pagination::new(page, per_page, total);

        let (clause, bind) = filter.clause();
        let sql = format!(
            "{} WHERE {} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            SUMMARY_SELECT, clause
        );

        let mut query = sqlx::query_as::<_, SummaryRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list posts")?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut summary = PostSummary::try_from(row)?;
            if let Some(id) = summary.post.id {
                summary.tags = self.tags_for_post(id).await?;
            }
            items.push(summary);
        }

        Ok(Page::new(items, pagination))
    }

    pub async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT t.id, t.name FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load post tags")?;

        Ok(rows.into_iter().map(|(id, name)| Tag { id, name }).collect())
    }

    /// Add one view in a single statement, returning the new count.
    pub async fn increment_view(&self, id: i64) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE posts SET view_times = view_times + 1 WHERE id = ? RETURNING view_times",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to increment post views")?;

        row.map(|(n,)| n)
            .ok_or_else(|| anyhow!("Post with id {} not found", id))
    }
}

async fn insert_post(conn: &mut SqliteConnection, post: &Post) -> Result<i64> {
    if let Err(e) = post.is_valid() {
        return Err(anyhow!("Invalid post: {}", e));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, intro, body, body_html, published, view_times,
                           author_id, category_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.title)
    .bind(&post.intro)
    .bind(post.body())
    .bind(post.body_html())
    .bind(post.published)
    .bind(post.view_times)
    .bind(post.author_id)
    .bind(post.category_id)
    .bind(post.created_at)
    .bind(post.updated_at)
    .execute(&mut *conn)
    .await
    .context("Failed to create post")?;

    Ok(result.last_insert_rowid())
}

async fn update_post(conn: &mut SqliteConnection, post: &Post) -> Result<()> {
    let id = post
        .id
        .ok_or_else(|| anyhow!("Cannot update post without id"))?;

    if let Err(e) = post.is_valid() {
        return Err(anyhow!("Invalid post: {}", e));
    }

    let result = sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, intro = ?, body = ?, body_html = ?, published = ?,
            category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.intro)
    .bind(post.body())
    .bind(post.body_html())
    .bind(post.published)
    .bind(post.category_id)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await
    .context("Failed to update post")?;

    if result.rows_affected() == 0 {
        return Err(anyhow!("Post with id {} not found", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_database, CategoryRepository, FollowRepository, TagRepository, UserRepository};
    use inkwell_core::models::user::User;
    use pretty_assertions::assert_eq;

    struct Fixture {
        pool: SqlitePool,
        repo: PostRepository,
        alice: i64,
        bob: i64,
    }

    async fn setup() -> Fixture {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let users = UserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("a@example.com".into(), "alice".into(), "pw").unwrap(), &[])
            .await
            .unwrap();
        let bob = users
            .create(&User::new("b@example.com".into(), "bob".into(), "pw").unwrap(), &[])
            .await
            .unwrap();
        Fixture {
            repo: PostRepository::new(pool.clone()),
            pool,
            alice,
            bob,
        }
    }

    async fn add_post(repo: &PostRepository, author: i64, title: &str, published: bool) -> i64 {
        let mut post = Post::new(author, title.into(), "intro".into(), "Some *body*").unwrap();
        post.published = published;
        repo.create(&post).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let f = setup().await;
        let id = add_post(&f.repo, f.alice, "Hello", true).await;

        let post = f.repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.body(), "Some *body*");
        assert!(post.body_html().contains("<em>body</em>"));

        let summary = f.repo.find_summary(id).await.unwrap().unwrap();
        assert_eq!(summary.author.username, "alice");
        assert_eq!(summary.comment_count, 0);
        assert!(summary.category.is_none());
    }

    #[tokio::test]
    async fn test_update_rederives_html() {
        let f = setup().await;
        let id = add_post(&f.repo, f.alice, "Hello", true).await;

        let mut post = f.repo.find_by_id(id).await.unwrap().unwrap();
        post.set_body("<script>bad()</script>\n\n**new**");
        post.title = "Changed".into();
        f.repo.update_with_tags(&post, &[]).await.unwrap();

        let post = f.repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(post.title, "Changed");
        assert!(post.body_html().contains("<strong>new</strong>"));
        assert!(!post.body_html().contains("script"));
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let f = setup().await;
        add_post(&f.repo, f.alice, "A1", true).await;
        add_post(&f.repo, f.alice, "A2 draft", false).await;
        add_post(&f.repo, f.bob, "B1", true).await;

        assert_eq!(f.repo.count(PostFilter::Published).await.unwrap(), 2);
        assert_eq!(
            f.repo
                .count(PostFilter::Author { id: f.alice, include_drafts: true })
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            f.repo
                .count(PostFilter::Author { id: f.alice, include_drafts: false })
                .await
                .unwrap(),
            1
        );

        let page = f.repo.list(PostFilter::Published, 1, 10).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|s| s.post.title.clone()).collect();
        assert_eq!(titles, vec!["B1".to_string(), "A1".to_string()]);
    }

    #[tokio::test]
    async fn test_pagination_beyond_range_is_empty() {
        let f = setup().await;
        for i in 0..3 {
            add_post(&f.repo, f.alice, &format!("Post {}", i), true).await;
        }

        let page = f.repo.list(PostFilter::Published, 2, 2).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.pagination.has_next());

        let page = f.repo.list(PostFilter::Published, 9, 2).await.unwrap();
        assert!(page.is_empty());
        assert!(page.pagination.is_out_of_range());
    }

    #[tokio::test]
    async fn test_followed_posts_include_own() {
        let f = setup().await;
        add_post(&f.repo, f.alice, "mine", true).await;
        add_post(&f.repo, f.bob, "bob's", true).await;

        let followed = f.repo.list(PostFilter::FollowedBy(f.alice), 1, 10).await.unwrap();
        assert_eq!(followed.items.len(), 1);
        assert_eq!(followed.items[0].post.title, "mine");

        FollowRepository::new(f.pool.clone())
            .follow(f.alice, f.bob)
            .await
            .unwrap();
        let followed = f.repo.list(PostFilter::FollowedBy(f.alice), 1, 10).await.unwrap();
        assert_eq!(followed.items.len(), 2);
    }

    #[tokio::test]
    async fn test_category_and_tag_filters() {
        let f = setup().await;
        let cat = CategoryRepository::new(f.pool.clone()).create("Rust").await.unwrap();
        let tags = TagRepository::new(f.pool.clone());

        let mut post = Post::new(f.alice, "Typed".into(), "".into(), "body").unwrap();
        post.category_id = Some(cat);
        let id = f
            .repo
            .create_with_tags(&post, &["async".into(), "web".into()])
            .await
            .unwrap();
        add_post(&f.repo, f.bob, "Other", true).await;

        let by_cat = f.repo.list(PostFilter::Category(cat), 1, 10).await.unwrap();
        assert_eq!(by_cat.items.len(), 1);
        assert_eq!(by_cat.items[0].category.as_ref().unwrap().name, "Rust");

        let tag = tags.find_by_name("web").await.unwrap().unwrap();
        let by_tag = f.repo.list(PostFilter::Tag(tag.id), 1, 10).await.unwrap();
        assert_eq!(by_tag.items.len(), 1);
        let names: Vec<_> = by_tag.items[0].tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["async", "web"]);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_tags() {
        let f = setup().await;
        let post = Post::new(f.alice, "Tagged".into(), "".into(), "body").unwrap();
        let id = f.repo.create_with_tags(&post, &["old".into()]).await.unwrap();

        let mut missing = f.repo.find_by_id(id).await.unwrap().unwrap();
        missing.id = Some(id + 100);
        assert!(f
            .repo
            .update_with_tags(&missing, &["new".into()])
            .await
            .is_err());

        let names: Vec<_> = f
            .repo
            .tags_for_post(id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["old".to_string()]);
        let orphan = f.repo.tags_for_post(id + 100).await.unwrap();
        assert!(orphan.is_empty());
    }

    #[tokio::test]
    async fn test_increment_view_is_atomic() {
        let f = setup().await;
        let id = add_post(&f.repo, f.alice, "Popular", true).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = PostRepository::new(f.pool.clone());
            handles.push(tokio::spawn(async move { repo.increment_view(id).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.repo.find_by_id(id).await.unwrap().unwrap().view_times, 20);
        assert!(f.repo.increment_view(9999).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_cascades_comments() {
        let f = setup().await;
        let id = add_post(&f.repo, f.alice, "Doomed", true).await;
        sqlx::query("INSERT INTO comments (body, body_html, author_id, post_id, created_at) VALUES ('x', '<p>x</p>', ?, ?, ?)")
            .bind(f.bob)
            .bind(id)
            .bind(Utc::now())
            .execute(&f.pool)
            .await
            .unwrap();

        f.repo.delete(id).await.unwrap();
        let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
        assert!(f.repo.delete(id).await.is_err());
    }
}
