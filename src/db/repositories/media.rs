//! Media repository
//!
//! Database operations for uploaded media records. The files themselves live
//! in the storage backend; rows here track metadata and ownership.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::MediaItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Media repository trait
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Record an uploaded file
    async fn create(
        &self,
        filename: &str,
        url: &str,
        mime_type: &str,
        size: i64,
        uploader_id: i64,
    ) -> Result<MediaItem>;

    /// Get a media record by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>>;

    /// List media records with pagination (newest first)
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<MediaItem>>;

    /// Count total media records
    async fn count(&self) -> Result<i64>;

    /// Delete a media record
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based media repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    /// Create a new SQLx media repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(
        &self,
        filename: &str,
        url: &str,
        mime_type: &str,
        size: i64,
        uploader_id: i64,
    ) -> Result<MediaItem> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_media_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    filename,
                    url,
                    mime_type,
                    size,
                    uploader_id,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                create_media_mysql(
                    self.pool.as_mysql().unwrap(),
                    filename,
                    url,
                    mime_type,
                    size,
                    uploader_id,
                )
                .await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_media_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_media_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<MediaItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_media_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_media_mysql(self.pool.as_mysql().unwrap(), offset, limit).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_media_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_media_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_media_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_media_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_media_sqlite(
    pool: &SqlitePool,
    filename: &str,
    url: &str,
    mime_type: &str,
    size: i64,
    uploader_id: i64,
) -> Result<MediaItem> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO media (filename, url, mime_type, size, uploader_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(filename)
    .bind(url)
    .bind(mime_type)
    .bind(size)
    .bind(uploader_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create media record")?;

    Ok(MediaItem {
        id: result.last_insert_rowid(),
        filename: filename.to_string(),
        url: url.to_string(),
        mime_type: mime_type.to_string(),
        size,
        uploader_id,
        created_at: now,
    })
}

async fn get_media_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<MediaItem>> {
    let row = sqlx::query(
        "SELECT id, filename, url, mime_type, size, uploader_id, created_at FROM media WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get media by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_media_sqlite(&row))),
        None => Ok(None),
    }
}

async fn list_media_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<Vec<MediaItem>> {
    let rows = sqlx::query(
        "SELECT id, filename, url, mime_type, size, uploader_id, created_at FROM media ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list media")?;

    Ok(rows.iter().map(row_to_media_sqlite).collect())
}

async fn count_media_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media")?;

    Ok(row.get("count"))
}

async fn delete_media_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM media WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete media record")?;

    Ok(())
}

fn row_to_media_sqlite(row: &sqlx::sqlite::SqliteRow) -> MediaItem {
    MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        url: row.get("url"),
        mime_type: row.get("mime_type"),
        size: row.get("size"),
        uploader_id: row.get("uploader_id"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_media_mysql(
    pool: &MySqlPool,
    filename: &str,
    url: &str,
    mime_type: &str,
    size: i64,
    uploader_id: i64,
) -> Result<MediaItem> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO media (filename, url, mime_type, size, uploader_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(filename)
    .bind(url)
    .bind(mime_type)
    .bind(size)
    .bind(uploader_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create media record")?;

    Ok(MediaItem {
        id: result.last_insert_id() as i64,
        filename: filename.to_string(),
        url: url.to_string(),
        mime_type: mime_type.to_string(),
        size,
        uploader_id,
        created_at: now,
    })
}

async fn get_media_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<MediaItem>> {
    let row = sqlx::query(
        "SELECT id, filename, url, mime_type, size, uploader_id, created_at FROM media WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get media by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_media_mysql(&row))),
        None => Ok(None),
    }
}

async fn list_media_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<Vec<MediaItem>> {
    let rows = sqlx::query(
        "SELECT id, filename, url, mime_type, size, uploader_id, created_at FROM media ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list media")?;

    Ok(rows.iter().map(row_to_media_mysql).collect())
}

async fn count_media_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM media")
        .fetch_one(pool)
        .await
        .context("Failed to count media")?;

    Ok(row.get("count"))
}

async fn delete_media_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM media WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete media record")?;

    Ok(())
}

fn row_to_media_mysql(row: &sqlx::mysql::MySqlRow) -> MediaItem {
    MediaItem {
        id: row.get("id"),
        filename: row.get("filename"),
        url: row.get("url"),
        mime_type: row.get("mime_type"),
        size: row.get("size"),
        uploader_id: row.get("uploader_id"),
        created_at: row.get("created_at"),
    }
}
