//! User service
//!
//! Business logic for accounts and authentication: registration (the first
//! user becomes admin), login/logout with opaque session tokens, session
//! validation and cleanup, and the password-reset flow. Reset tokens are
//! random, single-use, stored hashed and expire after a configurable TTL;
//! completing a reset invalidates every session of the user.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{generate_reset_token, hash_reset_token};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Default password-reset token lifetime in minutes
const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials or reset token)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
    reset_token_ttl_minutes: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
            reset_token_ttl_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
        }
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
            reset_token_ttl_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
        }
    }

    /// Override the reset-token lifetime (from config)
    pub fn with_reset_token_ttl(mut self, minutes: i64) -> Self {
        self.reset_token_ttl_minutes = minutes;
        self
    }

    /// Register a new user.
    ///
    /// The first user in the system automatically becomes an administrator;
    /// everyone after that starts as a contributor. Emails are normalized to
    /// lowercase before uniqueness checks and storage.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        self.validate_register_input(&input)?;

        let email = input.email.trim().to_lowercase();
        let username = input.username.trim().to_string();

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Contributor
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User::new(username, email, password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Login with username-or-email plus password, returning a new session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let user = self
            .find_user_by_username_or_email(&input.username_or_email)
            .await?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError(
                    "Invalid username or password".to_string(),
                )
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !password_valid {
            return Err(UserServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        self.create_session(user.id).await
    }

    /// Logout (invalidate the session). Unknown sessions are a no-op.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Validate a session token and return the associated user.
    ///
    /// Expired sessions are deleted on sight and treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Check if this is the first user (for auto-admin)
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;

        Ok(count == 0)
    }

    /// Start a password reset for the given email.
    ///
    /// Returns the user and the plaintext token to put in the reset email,
    /// or `None` when no account matches. Callers must not reveal which case
    /// occurred to the requester. A new request replaces any outstanding
    /// token.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, UserServiceError> {
        let email = email.trim().to_lowercase();

        let user = match self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up email")?
        {
            Some(u) => u,
            None => return Ok(None),
        };

        let (token, token_hash) =
            generate_reset_token().context("Failed to generate reset token")?;
        let expires_at = Utc::now() + Duration::minutes(self.reset_token_ttl_minutes);

        self.user_repo
            .set_reset_token(user.id, &token_hash, expires_at)
            .await
            .context("Failed to store reset token")?;

        Ok(Some((user, token)))
    }

    /// Complete a password reset.
    ///
    /// Verifies the token against the stored hash and its expiry, sets the
    /// new password, clears the token and invalidates every session of the
    /// user. A token can only succeed once.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if new_password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        let token_hash = hash_reset_token(token);

        let user = self
            .user_repo
            .get_by_reset_token_hash(&token_hash)
            .await
            .context("Failed to look up reset token")?
            .ok_or_else(|| {
                UserServiceError::AuthenticationError(
                    "Invalid or expired reset token".to_string(),
                )
            })?;

        let expired = match user.reset_token_expires_at {
            Some(expires_at) => expires_at < Utc::now(),
            None => true,
        };
        if expired {
            let _ = self.user_repo.clear_reset_token(user.id).await;
            return Err(UserServiceError::AuthenticationError(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let password_hash =
            hash_password(new_password).context("Failed to hash new password")?;

        self.user_repo
            .update_password(user.id, &password_hash)
            .await
            .context("Failed to update password")?;

        self.user_repo
            .clear_reset_token(user.id)
            .await
            .context("Failed to clear reset token")?;

        self.session_repo
            .delete_by_user(user.id)
            .await
            .context("Failed to invalidate sessions")?;

        Ok(())
    }

    /// Delete all expired sessions. Called periodically from a background
    /// task; returns the number of sessions deleted.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    fn validate_register_input(&self, input: &RegisterInput) -> Result<(), UserServiceError> {
        if input.username.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Username cannot be empty".to_string(),
            ));
        }

        if input.email.trim().is_empty() {
            return Err(UserServiceError::ValidationError(
                "Email cannot be empty".to_string(),
            ));
        }

        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        if !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "Invalid email format".to_string(),
            ));
        }

        Ok(())
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(&username_or_email.trim().to_lowercase())
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    // Counter for generating unique usernames/emails across test iterations
    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    async fn setup_property_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        UserService::new(user_repo, session_repo)
    }

    fn unique_suffix() -> u64 {
        TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// For any valid credentials, login returns a token that validates
        /// to the same user.
        #[test]
        fn auth_roundtrip(
            username in "[a-z]{3,10}",
            email_prefix in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_property_test_service().await;
                let suffix = unique_suffix();

                let unique_username = format!("{}_{}", username, suffix);
                let unique_email = format!("{}_{}@example.com", email_prefix, suffix);

                let registered_user = service
                    .register(RegisterInput::new(
                        unique_username.clone(),
                        unique_email,
                        password.clone(),
                    ))
                    .await
                    .expect("Registration should succeed");

                let session = service
                    .login(LoginInput::new(unique_username, password))
                    .await
                    .expect("Login should succeed with valid credentials");

                let validated_user = service.validate_session(&session.id).await
                    .expect("Session validation should not error")
                    .expect("Session should be valid and return user");

                prop_assert_eq!(validated_user.id, registered_user.id);
                prop_assert_eq!(validated_user.username, registered_user.username);
                Ok(())
            });
            result?;
        }

        /// A reset token that completed once never completes again, for any
        /// pair of new passwords.
        #[test]
        fn reset_token_never_reusable(
            first_password in "[a-zA-Z0-9]{8,20}",
            second_password in "[a-zA-Z0-9]{8,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_property_test_service().await;
                let suffix = unique_suffix();
                let email = format!("reset_{}@example.com", suffix);

                service
                    .register(RegisterInput::new(
                        format!("reset_{}", suffix),
                        email.clone(),
                        "initial-password",
                    ))
                    .await
                    .expect("Registration should succeed");

                let (_, token) = service
                    .request_password_reset(&email)
                    .await
                    .expect("Request should not error")
                    .expect("User should exist");

                service
                    .confirm_password_reset(&token, &first_password)
                    .await
                    .expect("First confirm should succeed");

                let second = service.confirm_password_reset(&token, &second_password).await;
                prop_assert!(
                    matches!(second, Err(UserServiceError::AuthenticationError(_))),
                    "A used token must not be accepted again"
                );
                Ok(())
            });
            result?;
        }
    }
}
