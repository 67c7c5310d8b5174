//! Database connection pools
//!
//! One binary, two deployment shapes: SQLite for the single-box install,
//! MySQL when the site outgrows it. `DatabasePool` is the shared handle;
//! repositories downcast through `as_sqlite`/`as_mysql` and dispatch on
//! `driver()`, and the migration runner drives raw DDL through `execute`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Common handle over the two supported database backends
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows; yields the affected-row count
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Cheap connectivity check
    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Normalize a configured SQLite location into a sqlx connection URL.
///
/// Accepts bare file paths, `sqlite:`-prefixed URLs and the in-memory
/// forms; file-backed databases get `mode=rwc` so the first boot creates
/// the file.
fn sqlite_connection_url(url: &str) -> String {
    if url == ":memory:" || url == "sqlite::memory:" {
        return "sqlite::memory:".to_string();
    }

    if let Some(rest) = url.strip_prefix("sqlite:") {
        if rest.contains('?') {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else {
        format!("sqlite:{}?mode=rwc", url)
    }
}

/// The on-disk path behind a SQLite URL, or `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<&str> {
    if url == ":memory:" || url == "sqlite::memory:" {
        return None;
    }
    Some(url.strip_prefix("sqlite:").unwrap_or(url))
}

/// SQLite-backed pool
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        // First boot on a fresh install: the data directory may not exist yet
        if let Some(path) = sqlite_file_path(url) {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect(&sqlite_connection_url(url))
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        // SQLite leaves FK enforcement off unless asked
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL-backed pool
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute statement: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Open the pool named by configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(SqliteDatabase::new(&config.url).await?)),
        DatabaseDriver::Mysql => Ok(Arc::new(MysqlDatabase::new(&config.url).await?)),
    }
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_url_for_bare_path() {
        assert_eq!(
            sqlite_connection_url("data/dawan.db"),
            "sqlite:data/dawan.db?mode=rwc"
        );
    }

    #[test]
    fn connection_url_preserves_explicit_query() {
        assert_eq!(
            sqlite_connection_url("sqlite:data/dawan.db?mode=ro"),
            "sqlite:data/dawan.db?mode=ro"
        );
    }

    #[test]
    fn connection_url_for_memory_forms() {
        assert_eq!(sqlite_connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(sqlite_connection_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn file_path_is_none_for_memory() {
        assert_eq!(sqlite_file_path(":memory:"), None);
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("sqlite:data/dawan.db"), Some("data/dawan.db"));
        assert_eq!(sqlite_file_path("data/dawan.db"), Some("data/dawan.db"));
    }

    #[tokio::test]
    async fn memory_pool_reports_sqlite_driver() {
        let pool = create_test_pool().await.expect("pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn execute_reports_affected_rows() {
        let pool = create_test_pool().await.expect("pool");

        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY, label TEXT)")
            .await
            .expect("create table");

        let affected = pool
            .execute("INSERT INTO scratch (label) VALUES ('a'), ('b')")
            .await
            .expect("insert");
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn file_pool_creates_missing_directories() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let db_path = temp_dir.path().join("nested").join("dawan.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("pool");
        pool.ping().await.expect("ping");
        assert!(db_path.exists());
    }

    #[tokio::test]
    #[ignore = "requires MySQL server"]
    async fn mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        };

        let pool = create_pool(&config).await.expect("pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
    }
}
