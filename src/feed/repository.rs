//! Post repository for feedsync.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{NewPost, Platform, Post, PostStatus};
use crate::db::{parse_datetime, DbPool};
use crate::Result;

/// Row type for a post from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    owner_account_id: i64,
    title: String,
    slug: String,
    content: String,
    excerpt: String,
    featured_image_url: Option<String>,
    status: String,
    source_feed_url: String,
    source_platform: String,
    external_id: String,
    published_at: Option<String>,
    created_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            owner_account_id: row.owner_account_id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            featured_image_url: row.featured_image_url,
            status: row.status.parse().unwrap_or(PostStatus::Draft),
            source_feed_url: row.source_feed_url,
            source_platform: row.source_platform.parse().unwrap_or(Platform::Rss),
            external_id: row.external_id,
            published_at: row.published_at.and_then(|s| parse_datetime(&s)),
            created_at: parse_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

const POST_COLUMNS: &str = "id, owner_account_id, title, slug, content, excerpt, \
     featured_image_url, status, source_feed_url, source_platform, external_id, \
     published_at, created_at";

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Repository for post operations.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Load every external ID already imported for an account.
    pub async fn external_ids_for_account(&self, account_id: i64) -> Result<HashSet<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT external_id FROM posts WHERE owner_account_id = ?")
                .bind(account_id)
                .fetch_all(self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    /// Insert a post unless the account already has one with the same external ID.
    ///
    /// Returns None when the insert was ignored as a duplicate. Any other
    /// constraint violation (such as a slug collision) is an error.
    pub async fn insert_or_ignore(&self, post: &NewPost) -> Result<Option<Post>> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (owner_account_id, title, slug, content, excerpt,
                featured_image_url, status, source_feed_url, source_platform,
                external_id, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (owner_account_id, external_id) DO NOTHING
            "#,
        )
        .bind(post.owner_account_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.featured_image_url)
        .bind(post.status.as_str())
        .bind(&post.source_feed_url)
        .bind(post.source_platform.as_str())
        .bind(&post.external_id)
        .bind(post.published_at.as_ref().map(format_datetime))
        .bind(format_datetime(&Utc::now()))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(result.last_insert_rowid()).await
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// Get an account's post by external ID.
    pub async fn get_by_external_id(
        &self,
        account_id: i64,
        external_id: &str,
    ) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE owner_account_id = ? AND external_id = ?"
        ))
        .bind(account_id)
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// Whether an account already has a post with this slug.
    pub async fn slug_exists(&self, account_id: i64, slug: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM posts WHERE owner_account_id = ? AND slug = ?")
                .bind(account_id)
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// List an account's posts, newest first.
    pub async fn list_by_account(
        &self,
        account_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE owner_account_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Count an account's posts.
    pub async fn count_by_account(&self, account_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE owner_account_id = ?")
            .bind(account_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a post.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
