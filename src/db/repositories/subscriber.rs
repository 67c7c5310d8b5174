//! Subscriber repository
//!
//! Database operations for newsletter subscribers.
//!
//! This module provides:
//! - `SubscriberRepository` trait defining the interface for subscriber data access
//! - `SqlxSubscriberRepository` implementing the trait for SQLite and MySQL
//!
//! Emails arrive already normalized (trimmed, lowercased) from the service
//! layer. Unsubscribed rows are kept as a suppression list; re-subscribing
//! flips the row back to active.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Subscriber, SubscriberStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscriber repository trait
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Create a new active subscriber
    async fn create(&self, email: &str) -> Result<Subscriber>;

    /// Get subscriber by email
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Set a subscriber's status; unsubscribing records the opt-out time,
    /// re-activating clears it
    async fn set_status(&self, id: i64, status: SubscriberStatus) -> Result<()>;

    /// List all active subscribers
    async fn list_active(&self) -> Result<Vec<Subscriber>>;

    /// Count active subscribers
    async fn count_active(&self) -> Result<i64>;
}

/// SQLx-based subscriber repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSubscriberRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriberRepository {
    /// Create a new SQLx subscriber repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriberRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriberRepository for SqlxSubscriberRepository {
    async fn create(&self, email: &str) -> Result<Subscriber> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_subscriber_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                create_subscriber_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_subscriber_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_subscriber_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn set_status(&self, id: i64, status: SubscriberStatus) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_subscriber_status_sqlite(self.pool.as_sqlite().unwrap(), id, status).await
            }
            DatabaseDriver::Mysql => {
                set_subscriber_status_mysql(self.pool.as_mysql().unwrap(), id, status).await
            }
        }
    }

    async fn list_active(&self) -> Result<Vec<Subscriber>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_active_subscribers_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_active_subscribers_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }

    async fn count_active(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_active_subscribers_sqlite(self.pool.as_sqlite().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                count_active_subscribers_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_subscriber_sqlite(pool: &SqlitePool, email: &str) -> Result<Subscriber> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO subscribers (email, status, subscribed_at) VALUES (?, 'active', ?)",
    )
    .bind(email)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create subscriber")?;

    Ok(Subscriber {
        id: result.last_insert_rowid(),
        email: email.to_string(),
        status: SubscriberStatus::Active,
        subscribed_at: now,
        unsubscribed_at: None,
    })
}

async fn get_subscriber_by_email_sqlite(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Subscriber>> {
    let row = sqlx::query(
        "SELECT id, email, status, subscribed_at, unsubscribed_at FROM subscribers WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get subscriber by email")?;

    match row {
        Some(row) => Ok(Some(row_to_subscriber_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn set_subscriber_status_sqlite(
    pool: &SqlitePool,
    id: i64,
    status: SubscriberStatus,
) -> Result<()> {
    let unsubscribed_at = match status {
        SubscriberStatus::Unsubscribed => Some(Utc::now()),
        SubscriberStatus::Active => None,
    };

    sqlx::query("UPDATE subscribers SET status = ?, unsubscribed_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(unsubscribed_at)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update subscriber status")?;

    Ok(())
}

async fn list_active_subscribers_sqlite(pool: &SqlitePool) -> Result<Vec<Subscriber>> {
    let rows = sqlx::query(
        "SELECT id, email, status, subscribed_at, unsubscribed_at FROM subscribers WHERE status = 'active' ORDER BY subscribed_at ASC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list active subscribers")?;

    let mut subscribers = Vec::new();
    for row in rows {
        subscribers.push(row_to_subscriber_sqlite(&row)?);
    }

    Ok(subscribers)
}

async fn count_active_subscribers_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM subscribers WHERE status = 'active'")
        .fetch_one(pool)
        .await
        .context("Failed to count active subscribers")?;

    Ok(row.get("count"))
}

fn row_to_subscriber_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Subscriber> {
    let status_str: String = row.get("status");
    let status = SubscriberStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid subscriber status: {}", status_str))?;

    Ok(Subscriber {
        id: row.get("id"),
        email: row.get("email"),
        status,
        subscribed_at: row.get("subscribed_at"),
        unsubscribed_at: row.try_get("unsubscribed_at").ok().flatten(),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_subscriber_mysql(pool: &MySqlPool, email: &str) -> Result<Subscriber> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO subscribers (email, status, subscribed_at) VALUES (?, 'active', ?)",
    )
    .bind(email)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create subscriber")?;

    Ok(Subscriber {
        id: result.last_insert_id() as i64,
        email: email.to_string(),
        status: SubscriberStatus::Active,
        subscribed_at: now,
        unsubscribed_at: None,
    })
}

async fn get_subscriber_by_email_mysql(
    pool: &MySqlPool,
    email: &str,
) -> Result<Option<Subscriber>> {
    let row = sqlx::query(
        "SELECT id, email, status, subscribed_at, unsubscribed_at FROM subscribers WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get subscriber by email")?;

    match row {
        Some(row) => Ok(Some(row_to_subscriber_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn set_subscriber_status_mysql(
    pool: &MySqlPool,
    id: i64,
    status: SubscriberStatus,
) -> Result<()> {
    let unsubscribed_at = match status {
        SubscriberStatus::Unsubscribed => Some(Utc::now()),
        SubscriberStatus::Active => None,
    };

    sqlx::query("UPDATE subscribers SET status = ?, unsubscribed_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(unsubscribed_at)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update subscriber status")?;

    Ok(())
}

async fn list_active_subscribers_mysql(pool: &MySqlPool) -> Result<Vec<Subscriber>> {
    let rows = sqlx::query(
        "SELECT id, email, status, subscribed_at, unsubscribed_at FROM subscribers WHERE status = 'active' ORDER BY subscribed_at ASC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list active subscribers")?;

    let mut subscribers = Vec::new();
    for row in rows {
        subscribers.push(row_to_subscriber_mysql(&row)?);
    }

    Ok(subscribers)
}

async fn count_active_subscribers_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM subscribers WHERE status = 'active'")
        .fetch_one(pool)
        .await
        .context("Failed to count active subscribers")?;

    Ok(row.get("count"))
}

fn row_to_subscriber_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Subscriber> {
    let status_str: String = row.get("status");
    let status = SubscriberStatus::from_str(&status_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid subscriber status: {}", status_str))?;

    Ok(Subscriber {
        id: row.get("id"),
        email: row.get("email"),
        status,
        subscribed_at: row.get("subscribed_at"),
        unsubscribed_at: row.try_get("unsubscribed_at").ok().flatten(),
    })
}
