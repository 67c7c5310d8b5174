//! Session persistence
//!
//! Sessions are the opaque tokens handed out at login (cookie or Bearer).
//! The repository stores rows verbatim and does not filter on expiry:
//! `get_by_id` returns an expired row and the user service is what rejects
//! it. `delete_by_user` backs the password-reset flow, which revokes every
//! session for the account; `delete_expired` backs the hourly sweep task.
//!
//! Both drivers accept the same `?`-placeholder SQL, so the statements are
//! shared and only the pool handle differs per arm.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

const INSERT: &str =
    "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_BY_ID: &str =
    "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM sessions WHERE id = ?";
const DELETE_BY_USER: &str = "DELETE FROM sessions WHERE user_id = ?";
const DELETE_EXPIRED: &str = "DELETE FROM sessions WHERE expires_at < ?";

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a freshly minted session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look up a session by its token. Expired sessions are still returned.
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete one session (logout)
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every session belonging to a user (password reset)
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete sessions past their expiry; returns how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-backed session repository for SQLite and MySQL
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(INSERT)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .map(|_| ()),
        }
        .context("Failed to insert session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SELECT_BY_ID)
                .bind(id)
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to look up session")?
                .map(|row| Session {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    expires_at: row.get("expires_at"),
                    created_at: row.get("created_at"),
                }),
            DatabaseDriver::Mysql => sqlx::query(SELECT_BY_ID)
                .bind(id)
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to look up session")?
                .map(|row| {
                    let expires_at: DateTime<Utc> = row.get("expires_at");
                    let created_at: DateTime<Utc> = row.get("created_at");
                    Session {
                        id: row.get("id"),
                        user_id: row.get("user_id"),
                        expires_at,
                        created_at,
                    }
                }),
        };

        Ok(session)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_BY_ID)
                .bind(id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_BY_ID)
                .bind(id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .map(|_| ()),
        }
        .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_BY_USER)
                .bind(user_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_BY_USER)
                .bind(user_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .map(|_| ()),
        }
        .context("Failed to revoke user sessions")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let removed = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_EXPIRED)
                .bind(now)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_EXPIRED)
                .bind(now)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to sweep expired sessions")?;

        Ok(removed as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup() -> (DynDatabasePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("test pool");
        migrations::run_migrations(&pool).await.expect("migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    // Sessions reference users; seed one per id so the FK holds.
    async fn seed_user(pool: &DynDatabasePool, id: i64) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("reporter{}", id))
        .bind(format!("reporter{}@dawan.example", id))
        .bind("hash")
        .bind("contributor")
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().expect("sqlite test pool"))
        .await
        .expect("seed user");
    }

    /// A session the way the login path mints one: uuid token, week-long expiry.
    fn login_session(user_id: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(7),
            created_at: now,
        }
    }

    fn expired_session(user_id: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now - Duration::hours(1),
            created_at: now - Duration::days(8),
        }
    }

    #[tokio::test]
    async fn minted_session_reads_back() {
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;

        let session = login_session(1);
        repo.create(&session).await.expect("create");

        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("lookup")
            .expect("session present");
        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, 1);
        assert_eq!(found.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let (_pool, repo) = setup().await;

        let found = repo.get_by_id("no-such-token").await.expect("lookup");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn logout_deletes_only_that_token() {
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;

        let kept = login_session(1);
        let dropped = login_session(1);
        repo.create(&kept).await.expect("create");
        repo.create(&dropped).await.expect("create");

        repo.delete(&dropped.id).await.expect("delete");

        assert!(repo.get_by_id(&dropped.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn password_reset_revokes_every_session_for_the_user() {
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;

        let browser = login_session(1);
        let phone = login_session(1);
        let other_account = login_session(2);
        repo.create(&browser).await.expect("create");
        repo.create(&phone).await.expect("create");
        repo.create(&other_account).await.expect("create");

        repo.delete_by_user(1).await.expect("revoke");

        assert!(repo.get_by_id(&browser.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&phone.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&other_account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_removes_expired_and_reports_count() {
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;

        let stale = expired_session(1);
        let live = login_session(1);
        repo.create(&stale).await.expect("create");
        repo.create(&live).await.expect("create");

        let removed = repo.delete_expired().await.expect("sweep");
        assert_eq!(removed, 1);

        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_with_only_live_sessions_removes_nothing() {
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;

        repo.create(&login_session(1)).await.expect("create");

        let removed = repo.delete_expired().await.expect("sweep");
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn expired_rows_remain_readable_until_swept() {
        // The repository does not filter on expiry; rejecting expired
        // sessions is the user service's job.
        let (pool, repo) = setup().await;
        seed_user(&pool, 1).await;

        let stale = expired_session(1);
        repo.create(&stale).await.expect("create");

        let found = repo
            .get_by_id(&stale.id)
            .await
            .expect("lookup")
            .expect("row still present");
        assert!(found.is_expired());
    }
}
