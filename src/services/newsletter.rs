//! Newsletter service
//!
//! Subscription management with HMAC-verified one-click unsubscribe links.
//! Emails are normalized (trimmed, lowercased) before any lookup or write,
//! so the same address can never subscribe twice under different casings.
//! Unsubscribe tokens are deterministic HMACs over the normalized email and
//! are never stored; see [`crate::services::token`].

use crate::db::repositories::SubscriberRepository;
use crate::models::{Subscriber, SubscriberStatus};
use crate::services::token::{mint_unsubscribe_token, verify_unsubscribe_token};
use anyhow::Context;
use std::sync::Arc;

/// Error types for newsletter operations
#[derive(Debug, thiserror::Error)]
pub enum NewsletterServiceError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The unsubscribe token does not match the email
    #[error("Invalid unsubscribe token")]
    InvalidToken,

    /// No subscriber with that email
    #[error("Subscriber not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Newsletter subscription service
pub struct NewsletterService {
    repo: Arc<dyn SubscriberRepository>,
    token_secret: String,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn SubscriberRepository>, token_secret: impl Into<String>) -> Self {
        Self {
            repo,
            token_secret: token_secret.into(),
        }
    }

    /// Subscribe an email address.
    ///
    /// Idempotent: an already-active subscriber is returned as-is, and a
    /// previously unsubscribed one is reactivated.
    pub async fn subscribe(&self, email: &str) -> Result<Subscriber, NewsletterServiceError> {
        let email = normalize_email(email)?;

        if let Some(existing) = self
            .repo
            .get_by_email(&email)
            .await
            .context("Failed to look up subscriber")?
        {
            if existing.status == SubscriberStatus::Active {
                return Ok(existing);
            }

            self.repo
                .set_status(existing.id, SubscriberStatus::Active)
                .await
                .context("Failed to reactivate subscriber")?;

            return self
                .repo
                .get_by_email(&email)
                .await
                .context("Failed to reload subscriber")?
                .ok_or(NewsletterServiceError::NotFound);
        }

        let subscriber = self
            .repo
            .create(&email)
            .await
            .context("Failed to create subscriber")?;

        Ok(subscriber)
    }

    /// Unsubscribe an email address using its HMAC token.
    ///
    /// Idempotent for already-unsubscribed addresses. Token verification is
    /// constant time and happens before any database access.
    pub async fn unsubscribe(&self, email: &str, token: &str) -> Result<(), NewsletterServiceError> {
        let email = normalize_email(email)?;

        if !verify_unsubscribe_token(&self.token_secret, &email, token) {
            return Err(NewsletterServiceError::InvalidToken);
        }

        let subscriber = self
            .repo
            .get_by_email(&email)
            .await
            .context("Failed to look up subscriber")?
            .ok_or(NewsletterServiceError::NotFound)?;

        if subscriber.status == SubscriberStatus::Unsubscribed {
            return Ok(());
        }

        self.repo
            .set_status(subscriber.id, SubscriberStatus::Unsubscribed)
            .await
            .context("Failed to unsubscribe")?;

        Ok(())
    }

    /// Mint the unsubscribe token for a (normalized) email address, for
    /// embedding in campaign footers
    pub fn unsubscribe_token(&self, email: &str) -> Result<String, NewsletterServiceError> {
        let email = normalize_email(email)?;
        Ok(mint_unsubscribe_token(&self.token_secret, &email))
    }

    /// All active subscribers, oldest first (campaign send order)
    pub async fn list_active(&self) -> Result<Vec<Subscriber>, NewsletterServiceError> {
        let subscribers = self
            .repo
            .list_active()
            .await
            .context("Failed to list subscribers")?;

        Ok(subscribers)
    }

    /// Number of active subscribers
    pub async fn count_active(&self) -> Result<i64, NewsletterServiceError> {
        let count = self
            .repo
            .count_active()
            .await
            .context("Failed to count subscribers")?;

        Ok(count)
    }
}

/// Trim and lowercase an email, rejecting obviously invalid addresses
fn normalize_email(email: &str) -> Result<String, NewsletterServiceError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(NewsletterServiceError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }

    if !email.contains('@') {
        return Err(NewsletterServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(email)
}
