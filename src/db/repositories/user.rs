//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Password-reset state is stored on the user row (hashed token + expiry)
//! and cleared as a unit.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// Update a user's password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Store a hashed reset token and its expiry, replacing any prior one
    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Find the user holding the given hashed reset token
    async fn get_by_reset_token_hash(&self, token_hash: &str) -> Result<Option<User>>;

    /// Clear any outstanding reset token
    async fn clear_reset_token(&self, id: i64) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await
            }
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_password_sqlite(self.pool.as_sqlite().unwrap(), id, password_hash).await
            }
            DatabaseDriver::Mysql => {
                update_password_mysql(self.pool.as_mysql().unwrap(), id, password_hash).await
            }
        }
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_reset_token_sqlite(self.pool.as_sqlite().unwrap(), id, token_hash, expires_at)
                    .await
            }
            DatabaseDriver::Mysql => {
                set_reset_token_mysql(self.pool.as_mysql().unwrap(), id, token_hash, expires_at)
                    .await
            }
        }
    }

    async fn get_by_reset_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_reset_token_hash_sqlite(self.pool.as_sqlite().unwrap(), token_hash).await
            }
            DatabaseDriver::Mysql => {
                get_by_reset_token_hash_mysql(self.pool.as_mysql().unwrap(), token_hash).await
            }
        }
    }

    async fn clear_reset_token(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                clear_reset_token_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                clear_reset_token_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, reset_token_hash, reset_token_expires_at, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        role: user.role,
        reset_token_hash: None,
        reset_token_expires_at: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn update_password_sqlite(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;

    Ok(())
}

async fn set_reset_token_sqlite(
    pool: &SqlitePool,
    id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = ?, reset_token_expires_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(token_hash)
    .bind(expires_at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to set reset token")?;

    Ok(())
}

async fn get_by_reset_token_hash_sqlite(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE reset_token_hash = ?",
        USER_COLUMNS
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by reset token")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn clear_reset_token_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = NULL, reset_token_expires_at = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to clear reset token")?;

    Ok(())
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid user role: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        reset_token_hash: row.try_get("reset_token_hash").ok().flatten(),
        reset_token_expires_at: row.try_get("reset_token_expires_at").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        role: user.role,
        reset_token_hash: None,
        reset_token_expires_at: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn update_password_mysql(pool: &MySqlPool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update password")?;

    Ok(())
}

async fn set_reset_token_mysql(
    pool: &MySqlPool,
    id: i64,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = ?, reset_token_expires_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(token_hash)
    .bind(expires_at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to set reset token")?;

    Ok(())
}

async fn get_by_reset_token_hash_mysql(
    pool: &MySqlPool,
    token_hash: &str,
) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE reset_token_hash = ?",
        USER_COLUMNS
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by reset token")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn clear_reset_token_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE users SET reset_token_hash = NULL, reset_token_expires_at = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to clear reset token")?;

    Ok(())
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid user role: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        reset_token_hash: row.try_get("reset_token_hash").ok().flatten(),
        reset_token_expires_at: row.try_get("reset_token_expires_at").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
