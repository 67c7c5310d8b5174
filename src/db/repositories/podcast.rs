//! Podcast repository
//!
//! Database operations for podcast episodes.
//!
//! This module provides:
//! - `PodcastRepository` trait defining the interface for podcast data access
//! - `SqlxPodcastRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreatePodcastInput, Podcast, PostStatus, UpdatePodcastInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Podcast repository trait
#[async_trait]
pub trait PodcastRepository: Send + Sync {
    /// Create a new podcast episode
    async fn create(&self, input: &CreatePodcastInput) -> Result<Podcast>;

    /// Get episode by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Podcast>>;

    /// Get episode by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Podcast>>;

    /// List episodes with pagination (all statuses, newest first)
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Podcast>>;

    /// Count total episodes
    async fn count(&self) -> Result<i64>;

    /// List only published episodes (ordered by published_at DESC)
    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Podcast>>;

    /// Count published episodes
    async fn count_published(&self) -> Result<i64>;

    /// Update an episode
    async fn update(&self, id: i64, input: &UpdatePodcastInput) -> Result<Podcast>;

    /// Delete an episode
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based podcast repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPodcastRepository {
    pool: DynDatabasePool,
}

impl SqlxPodcastRepository {
    /// Create a new SQLx podcast repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PodcastRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PodcastRepository for SqlxPodcastRepository {
    async fn create(&self, input: &CreatePodcastInput) -> Result<Podcast> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_podcast_sqlite(self.pool.as_sqlite().unwrap(), input).await
            }
            DatabaseDriver::Mysql => {
                create_podcast_mysql(self.pool.as_mysql().unwrap(), input).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Podcast>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_podcast_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_podcast_by_id_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Podcast>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_podcast_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_podcast_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Podcast>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_podcasts_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_podcasts_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_podcasts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_podcasts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list_published(&self, offset: i64, limit: i64) -> Result<Vec<Podcast>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_published_podcasts_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_published_podcasts_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn count_published(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_published_podcasts_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                count_published_podcasts_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }

    async fn update(&self, id: i64, input: &UpdatePodcastInput) -> Result<Podcast> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_podcast_sqlite(self.pool.as_sqlite().unwrap(), id, input).await
            }
            DatabaseDriver::Mysql => {
                update_podcast_mysql(self.pool.as_mysql().unwrap(), id, input).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_podcast_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_podcast_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                podcast_exists_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                podcast_exists_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }
}

const PODCAST_COLUMNS: &str = "id, slug, title, description, audio_url, duration_secs, cover_image, status, published_at, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_podcast_sqlite(pool: &SqlitePool, input: &CreatePodcastInput) -> Result<Podcast> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();
    let published_at = if status == PostStatus::Published {
        Some(now)
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        INSERT INTO podcasts (slug, title, description, audio_url, duration_secs, cover_image, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.audio_url)
    .bind(input.duration_secs)
    .bind(&input.cover_image)
    .bind(status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create podcast")?;

    Ok(Podcast {
        id: result.last_insert_rowid(),
        slug: input.slug.clone(),
        title: input.title.clone(),
        description: input.description.clone(),
        audio_url: input.audio_url.clone(),
        duration_secs: input.duration_secs,
        cover_image: input.cover_image.clone(),
        status,
        published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_podcast_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Podcast>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE id = ?",
        PODCAST_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get podcast by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_podcast_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_podcast_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Podcast>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE slug = ?",
        PODCAST_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get podcast by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_podcast_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_podcasts_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<Podcast>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM podcasts ORDER BY created_at DESC LIMIT ? OFFSET ?",
        PODCAST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list podcasts")?;

    let mut podcasts = Vec::new();
    for row in rows {
        podcasts.push(row_to_podcast_sqlite(&row)?);
    }

    Ok(podcasts)
}

async fn count_podcasts_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts")
        .fetch_one(pool)
        .await
        .context("Failed to count podcasts")?;

    Ok(row.get("count"))
}

async fn list_published_podcasts_sqlite(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Podcast>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
        PODCAST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published podcasts")?;

    let mut podcasts = Vec::new();
    for row in rows {
        podcasts.push(row_to_podcast_sqlite(&row)?);
    }

    Ok(podcasts)
}

async fn count_published_podcasts_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published podcasts")?;

    Ok(row.get("count"))
}

async fn update_podcast_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdatePodcastInput,
) -> Result<Podcast> {
    let existing = get_podcast_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Podcast not found"))?;

    let now = Utc::now();
    let new_slug = input.slug.as_ref().unwrap_or(&existing.slug);
    let new_title = input.title.as_ref().unwrap_or(&existing.title);
    let new_description = input.description.as_ref().unwrap_or(&existing.description);
    let new_audio_url = input.audio_url.as_ref().unwrap_or(&existing.audio_url);
    let new_duration = input.duration_secs.or(existing.duration_secs);
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

    sqlx::query(
        r#"
        UPDATE podcasts
        SET slug = ?, title = ?, description = ?, audio_url = ?, duration_secs = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(new_slug)
    .bind(new_title)
    .bind(new_description)
    .bind(new_audio_url)
    .bind(new_duration)
    .bind(&new_cover_image)
    .bind(new_status.as_str())
    .bind(new_published_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update podcast")?;

    get_podcast_by_id_sqlite(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Podcast not found after update"))
}

async fn delete_podcast_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM podcasts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete podcast")?;

    Ok(())
}

async fn podcast_exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check podcast slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_podcast_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Podcast> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid podcast status: {}", status_str))?;

    Ok(Podcast {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        audio_url: row.get("audio_url"),
        duration_secs: row.try_get("duration_secs").ok().flatten(),
        cover_image: row.try_get("cover_image").ok().flatten(),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_podcast_mysql(pool: &MySqlPool, input: &CreatePodcastInput) -> Result<Podcast> {
    let now = Utc::now();
    let status = input.status.unwrap_or_default();
    let published_at = if status == PostStatus::Published {
        Some(now)
    } else {
        None
    };

    let result = sqlx::query(
        r#"
        INSERT INTO podcasts (slug, title, description, audio_url, duration_secs, cover_image, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.slug)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.audio_url)
    .bind(input.duration_secs)
    .bind(&input.cover_image)
    .bind(status.as_str())
    .bind(published_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create podcast")?;

    Ok(Podcast {
        id: result.last_insert_id() as i64,
        slug: input.slug.clone(),
        title: input.title.clone(),
        description: input.description.clone(),
        audio_url: input.audio_url.clone(),
        duration_secs: input.duration_secs,
        cover_image: input.cover_image.clone(),
        status,
        published_at,
        created_at: now,
        updated_at: now,
    })
}

async fn get_podcast_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Podcast>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE id = ?",
        PODCAST_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get podcast by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_podcast_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_podcast_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Podcast>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE slug = ?",
        PODCAST_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get podcast by slug")?;

    match row {
        Some(row) => Ok(Some(row_to_podcast_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_podcasts_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<Podcast>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM podcasts ORDER BY created_at DESC LIMIT ? OFFSET ?",
        PODCAST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list podcasts")?;

    let mut podcasts = Vec::new();
    for row in rows {
        podcasts.push(row_to_podcast_mysql(&row)?);
    }

    Ok(podcasts)
}

async fn count_podcasts_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts")
        .fetch_one(pool)
        .await
        .context("Failed to count podcasts")?;

    Ok(row.get("count"))
}

async fn list_published_podcasts_mysql(
    pool: &MySqlPool,
    offset: i64,
    limit: i64,
) -> Result<Vec<Podcast>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM podcasts WHERE status = 'published' ORDER BY published_at DESC LIMIT ? OFFSET ?",
        PODCAST_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list published podcasts")?;

    let mut podcasts = Vec::new();
    for row in rows {
        podcasts.push(row_to_podcast_mysql(&row)?);
    }

    Ok(podcasts)
}

async fn count_published_podcasts_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts WHERE status = 'published'")
        .fetch_one(pool)
        .await
        .context("Failed to count published podcasts")?;

    Ok(row.get("count"))
}

async fn update_podcast_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdatePodcastInput,
) -> Result<Podcast> {
    let existing = get_podcast_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Podcast not found"))?;

    let now = Utc::now();
    let new_slug = input.slug.as_ref().unwrap_or(&existing.slug);
    let new_title = input.title.as_ref().unwrap_or(&existing.title);
    let new_description = input.description.as_ref().unwrap_or(&existing.description);
    let new_audio_url = input.audio_url.as_ref().unwrap_or(&existing.audio_url);
    let new_duration = input.duration_secs.or(existing.duration_secs);
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

    sqlx::query(
        r#"
        UPDATE podcasts
        SET slug = ?, title = ?, description = ?, audio_url = ?, duration_secs = ?, cover_image = ?, status = ?, published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(new_slug)
    .bind(new_title)
    .bind(new_description)
    .bind(new_audio_url)
    .bind(new_duration)
    .bind(&new_cover_image)
    .bind(new_status.as_str())
    .bind(new_published_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update podcast")?;

    get_podcast_by_id_mysql(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Podcast not found after update"))
}

async fn delete_podcast_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM podcasts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete podcast")?;

    Ok(())
}

async fn podcast_exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM podcasts WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check podcast slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_podcast_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Podcast> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid podcast status: {}", status_str))?;

    Ok(Podcast {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        description: row.get("description"),
        audio_url: row.get("audio_url"),
        duration_secs: row.try_get("duration_secs").ok().flatten(),
        cover_image: row.try_get("cover_image").ok().flatten(),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
