//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Post content is a Lexical rich-text document; it is stored as JSON text
//! and parsed back into `serde_json::Value` at this boundary.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreatePostInput, Post, PostStatus, UpdatePostInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List posts with pagination (all statuses, newest first)
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count total posts (all statuses)
    async fn count(&self) -> Result<i64>;

    /// List only published posts (ordered by published_at DESC)
    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count published posts
    async fn count_published(&self) -> Result<i64>;

    /// Update a post
    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Check if a slug exists for a different post (for updates)
    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool>;

    /// Atomically increment the view counter
    async fn increment_view(&self, id: i64) -> Result<()>;

    /// Record the generated audio URL and the fingerprint of the spoken
    /// text it was produced from. Passing `None` clears both.
    async fn set_audio(
        &self,
        id: i64,
        audio_url: Option<&str>,
        content_hash: Option<&str>,
    ) -> Result<()>;

    /// Search posts by keyword in title and excerpt
    async fn search(&self, keyword: &str, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count search results
    async fn count_search(&self, keyword: &str) -> Result<i64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_post_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => create_post_mysql(self.pool.as_mysql().unwrap(), input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_post_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_posts_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_published_posts_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn count_published(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_published_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_published_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdatePostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_post_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => {
                update_post_mysql(self.pool.as_mysql().unwrap(), id, input).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn exists_by_slug_excluding(&self, slug: &str, exclude_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_by_slug_excluding_sqlite(self.pool.as_sqlite().unwrap(), slug, exclude_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                exists_by_slug_excluding_mysql(self.pool.as_mysql().unwrap(), slug, exclude_id)
                    .await
            }
        }
    }

    async fn increment_view(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                increment_view_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => increment_view_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn set_audio(
        &self,
        id: i64,
        audio_url: Option<&str>,
        content_hash: Option<&str>,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_audio_sqlite(self.pool.as_sqlite().unwrap(), id, audio_url, content_hash).await
            }
            DatabaseDriver::Mysql => {
                set_audio_mysql(self.pool.as_mysql().unwrap(), id, audio_url, content_hash).await
            }
        }
    }

    async fn search(&self, keyword: &str, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_posts_sqlite(self.pool.as_sqlite().unwrap(), keyword, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                search_posts_mysql(self.pool.as_mysql().unwrap(), keyword, offset, limit).await
            }
        }
    }

    async fn count_search(&self, keyword: &str) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_search_sqlite(self.pool.as_sqlite().unwrap(), keyword).await
            }
            DatabaseDriver::Mysql => {
                count_search_mysql(self.pool.as_mysql().unwrap(), keyword).await
            }
        }
    }
}

const POST_COLUMNS: &str = "id, slug, title, content, excerpt, cover_image, author_id, status, published_at, created_at, updated_at, audio_url, content_hash, view_count, like_count";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();
    let published_at = if status == PostStatus::Published {
        Some(now)
    } else {
        None
    };
    let content_json =
        serde_json::to_string(&input.content).context("Failed to serialize post content")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, excerpt, cover_image, author_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&content_json)
    .bind(&input.excerpt)
    .bind(&input.cover_image)
    .bind(input.author_id)
    .bind(status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_rowid();

    Ok(Post {
        id,
        slug: input.slug.clone(),
        title: input.title.clone(),
        content: input.content.clone(),
        excerpt: input.excerpt.clone(),
        cover_image: input.cover_image.clone(),
        author_id: input.author_id,
        status,
        published_at,
        created_at: now,
        updated_at: now,
        audio_url: None,
        content_hash: None,
        view_count: 0,
        like_count: 0,
    })
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE id = ?",
        POST_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE slug = ?",
        POST_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_sqlite(&row)?);
    }

    Ok(posts)
}

async fn count_posts_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn list_published_posts_sqlite(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_sqlite(&row)?);
    }

    Ok(posts)
}

async fn count_published_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;

    Ok(row.get("count"))
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &UpdatePostInput) -> Result<Post> {
    let existing = get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let now = Utc::now();
    let new_slug = input.slug.as_ref().unwrap_or(&existing.slug);
    let new_title = input.title.as_ref().unwrap_or(&existing.title);
    let new_content = input.content.as_ref().unwrap_or(&existing.content);
    let new_excerpt = input.excerpt.clone().or(existing.excerpt.clone());
    let new_cover_image = input.cover_image.clone().or(existing.cover_image.clone());
    let new_status = input.status.unwrap_or(existing.status);

    // Set published_at on the first transition to Published; clear it when
    // the post leaves the published state.
    let new_published_at =
        if new_status == PostStatus::Published && existing.status != PostStatus::Published {
            Some(now)
        } else if new_status != PostStatus::Published {
            None
        } else {
            existing.published_at
        };

    let content_json =
        serde_json::to_string(new_content).context("Failed to serialize post content")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET slug = ?, title = ?, content = ?, excerpt = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(new_slug)
    .bind(new_title)
    .bind(&content_json)
    .bind(&new_excerpt)
    .bind(&new_cover_image)
    .bind(new_status.as_str())
    .bind(new_published_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn exists_by_slug_excluding_sqlite(
    pool: &SqlitePool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn increment_view_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to increment view count")?;

    Ok(())
}

async fn set_audio_sqlite(
    pool: &SqlitePool,
    id: i64,
    audio_url: Option<&str>,
    content_hash: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE posts SET audio_url = ?, content_hash = ? WHERE id = ?")
        .bind(audio_url)
        .bind(content_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update post audio")?;

    Ok(())
}

async fn search_posts_sqlite(
    pool: &SqlitePool,
    keyword: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let pattern = format!("%{}%", keyword);

    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE status = 'published' AND (title LIKE ? OR excerpt LIKE ?) ORDER BY published_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_sqlite(&row)?);
    }

    Ok(posts)
}

async fn count_search_sqlite(pool: &SqlitePool, keyword: &str) -> Result<i64> {
    let pattern = format!("%{}%", keyword);

    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM posts WHERE status = 'published' AND (title LIKE ? OR excerpt LIKE ?)",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count search results")?;

    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status_str))?;

    let content_json: String = row.get("content");
    let content =
        serde_json::from_str(&content_json).context("Failed to parse post content JSON")?;

    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content,
        excerpt: row.try_get("excerpt").ok(),
        cover_image: row.try_get("cover_image").ok(),
        author_id: row.get("author_id"),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        audio_url: row.try_get("audio_url").ok().flatten(),
        content_hash: row.try_get("content_hash").ok().flatten(),
        view_count: row.try_get("view_count").unwrap_or(0),
        like_count: row.try_get("like_count").unwrap_or(0),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<Post> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();
    let published_at = if status == PostStatus::Published {
        Some(now)
    } else {
        None
    };
    let content_json =
        serde_json::to_string(&input.content).context("Failed to serialize post content")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (slug, title, content, excerpt, cover_image, author_id, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&content_json)
    .bind(&input.excerpt)
    .bind(&input.cover_image)
    .bind(input.author_id)
    .bind(status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    let id = result.last_insert_id() as i64;

    Ok(Post {
        id,
        slug: input.slug.clone(),
        title: input.title.clone(),
        content: input.content.clone(),
        excerpt: input.excerpt.clone(),
        cover_image: input.cover_image.clone(),
        author_id: input.author_id,
        status,
        published_at,
        created_at: now,
        updated_at: now,
        audio_url: None,
        content_hash: None,
        view_count: 0,
        like_count: 0,
    })
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE id = ?",
        POST_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_post_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Post>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE slug = ?",
        POST_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_post_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_posts_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_mysql(&row)?);
    }

    Ok(posts)
}

async fn count_posts_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn list_published_posts_mysql(
    pool: &MySqlPool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_mysql(&row)?);
    }

    Ok(posts)
}

async fn count_published_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published posts")?;

    Ok(row.get("count"))
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &UpdatePostInput) -> Result<Post> {
    let existing = get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let now = Utc::now();
    let new_slug = input.slug.as_ref().unwrap_or(&existing.slug);
    let new_title = input.title.as_ref().unwrap_or(&existing.title);
    let new_content = input.content.as_ref().unwrap_or(&existing.content);
    let new_excerpt = input.excerpt.clone().or(existing.excerpt.clone());
    let new_cover_image = input.cover_image.clone().or(existing.cover_image.clone());
    let new_status = input.status.unwrap_or(existing.status);

    let new_published_at =
        if new_status == PostStatus::Published && existing.status != PostStatus::Published {
            Some(now)
        } else if new_status != PostStatus::Published {
            None
        } else {
            existing.published_at
        };

    let content_json =
        serde_json::to_string(new_content).context("Failed to serialize post content")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET slug = ?, title = ?, content = ?, excerpt = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(new_slug)
    .bind(new_title)
    .bind(&content_json)
    .bind(&new_excerpt)
    .bind(&new_cover_image)
    .bind(new_status.as_str())
    .bind(new_published_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    get_post_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn exists_by_slug_excluding_mysql(
    pool: &MySqlPool,
    slug: &str,
    exclude_id: i64,
) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE slug = ? AND id != ?")
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
        .context("Failed to check post slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn increment_view_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to increment view count")?;

    Ok(())
}

async fn set_audio_mysql(
    pool: &MySqlPool,
    id: i64,
    audio_url: Option<&str>,
    content_hash: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE posts SET audio_url = ?, content_hash = ? WHERE id = ?")
        .bind(audio_url)
        .bind(content_hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update post audio")?;

    Ok(())
}

async fn search_posts_mysql(
    pool: &MySqlPool,
    keyword: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let pattern = format!("%{}%", keyword);

    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE status = 'published' AND (title LIKE ? OR excerpt LIKE ?) ORDER BY published_at DESC LIMIT ? OFFSET ?",
        POST_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row_to_post_mysql(&row)?);
    }

    Ok(posts)
}

async fn count_search_mysql(pool: &MySqlPool, keyword: &str) -> Result<i64> {
    let pattern = format!("%{}%", keyword);

    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM posts WHERE status = 'published' AND (title LIKE ? OR excerpt LIKE ?)",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count search results")?;

    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid post status: {}", status_str))?;

    let content_json: String = row.get("content");
    let content =
        serde_json::from_str(&content_json).context("Failed to parse post content JSON")?;

    Ok(Post {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        content,
        excerpt: row.try_get("excerpt").ok(),
        cover_image: row.try_get("cover_image").ok(),
        author_id: row.get("author_id"),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        audio_url: row.try_get("audio_url").ok().flatten(),
        content_hash: row.try_get("content_hash").ok().flatten(),
        view_count: row.try_get("view_count").unwrap_or(0),
        like_count: row.try_get("like_count").unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_user(pool: &SqlitePool) -> i64 {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ('author', 'author@example.com', 'hash')",
        )
        .execute(pool)
        .await
        .expect("Failed to create test user");
        result.last_insert_rowid()
    }

    fn create_test_input(slug: &str, title: &str, author_id: i64) -> CreatePostInput {
        CreatePostInput {
            slug: slug.to_string(),
            title: title.to_string(),
            content: serde_json::json!({
                "root": {
                    "type": "root",
                    "children": [
                        {"type": "paragraph", "children": [{"type": "text", "text": "Body."}]}
                    ]
                }
            }),
            excerpt: None,
            cover_image: None,
            author_id,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_draft_post() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let input = create_test_input("hello-world", "Hello World", user_id);
        let created = repo.create(&input).await.expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.slug, "hello-world");
        assert_eq!(created.status, PostStatus::Draft);
        assert!(created.published_at.is_none());
        assert!(created.audio_url.is_none());
    }

    #[tokio::test]
    async fn test_create_published_post_sets_published_at() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let mut input = create_test_input("published", "Published", user_id);
        input.status = Some(PostStatus::Published);

        let created = repo.create(&input).await.expect("Failed to create post");
        assert_eq!(created.status, PostStatus::Published);
        assert!(created.published_at.is_some());
    }

    #[tokio::test]
    async fn test_get_by_slug_roundtrips_content() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let input = create_test_input("rich-text", "Rich Text", user_id);
        repo.create(&input).await.expect("Failed to create post");

        let found = repo
            .get_by_slug("rich-text")
            .await
            .expect("Failed to get post")
            .expect("Post not found");

        assert_eq!(found.content, input.content);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        let found = repo.get_by_id(99999).await.expect("Failed to get post");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        for i in 1..=2 {
            let input = create_test_input(&format!("draft-{}", i), "Draft", user_id);
            repo.create(&input).await.expect("Failed to create post");
        }
        for i in 1..=3 {
            let mut input = create_test_input(&format!("pub-{}", i), "Published", user_id);
            input.status = Some(PostStatus::Published);
            repo.create(&input).await.expect("Failed to create post");
        }

        let published = repo.list_published(0, 10).await.expect("Failed to list");
        assert_eq!(published.len(), 3);
        for post in &published {
            assert_eq!(post.status, PostStatus::Published);
        }

        let count = repo.count_published().await.expect("Failed to count");
        assert_eq!(count, 3);
        let total = repo.count().await.expect("Failed to count");
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_update_publish_transition() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let input = create_test_input("draft", "Draft", user_id);
        let created = repo.create(&input).await.expect("Failed to create post");
        assert!(created.published_at.is_none());

        let update = UpdatePostInput {
            status: Some(PostStatus::Published),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.expect("update");
        assert_eq!(updated.status, PostStatus::Published);
        assert!(updated.published_at.is_some());

        // Moving back to draft clears published_at
        let update = UpdatePostInput {
            status: Some(PostStatus::Draft),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.expect("update");
        assert!(updated.published_at.is_none());
    }

    #[tokio::test]
    async fn test_increment_view() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let input = create_test_input("viewed", "Viewed", user_id);
        let created = repo.create(&input).await.expect("Failed to create post");

        repo.increment_view(created.id).await.expect("increment");
        repo.increment_view(created.id).await.expect("increment");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("get")
            .expect("found");
        assert_eq!(found.view_count, 2);
    }

    #[tokio::test]
    async fn test_set_and_clear_audio() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let input = create_test_input("spoken", "Spoken", user_id);
        let created = repo.create(&input).await.expect("Failed to create post");

        repo.set_audio(created.id, Some("/media/audio/abc.wav"), Some("d41d8cd9"))
            .await
            .expect("set audio");

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("get")
            .expect("found");
        assert_eq!(found.audio_url.as_deref(), Some("/media/audio/abc.wav"));
        assert_eq!(found.content_hash.as_deref(), Some("d41d8cd9"));

        repo.set_audio(created.id, None, None).await.expect("clear");
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("get")
            .expect("found");
        assert!(found.audio_url.is_none());
        assert!(found.content_hash.is_none());
    }

    #[tokio::test]
    async fn test_exists_by_slug_excluding() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let first = repo
            .create(&create_test_input("slug-1", "One", user_id))
            .await
            .expect("create");
        let second = repo
            .create(&create_test_input("slug-2", "Two", user_id))
            .await
            .expect("create");

        assert!(repo
            .exists_by_slug_excluding("slug-1", second.id)
            .await
            .expect("check"));
        assert!(!repo
            .exists_by_slug_excluding("slug-1", first.id)
            .await
            .expect("check"));
    }

    #[tokio::test]
    async fn test_search_published_only() {
        let (pool, repo) = setup_test_repo().await;
        let user_id = create_test_user(pool.as_sqlite().unwrap()).await;

        let mut input = create_test_input("africa-news", "Somalia economy update", user_id);
        input.status = Some(PostStatus::Published);
        repo.create(&input).await.expect("create");

        let input = create_test_input("hidden-draft", "Somalia draft coverage", user_id);
        repo.create(&input).await.expect("create");

        let results = repo.search("Somalia", 0, 10).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].slug, "africa-news");

        let count = repo.count_search("Somalia").await.expect("count");
        assert_eq!(count, 1);
    }
}
