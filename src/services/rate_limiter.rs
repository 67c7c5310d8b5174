//! Login rate limiting
//!
//! Sliding-window limits against credential stuffing: failed attempts are
//! tracked per username (case-insensitive) and login requests per source IP.
//! Windows are pruned lazily on check and swept by a periodic cleanup task.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failed attempts allowed per username within its window
const USERNAME_MAX_ATTEMPTS: usize = 5;

/// Username window length in minutes
const USERNAME_WINDOW_MINUTES: i64 = 15;

/// Login requests allowed per IP within its window
const IP_MAX_REQUESTS: usize = 10;

/// IP window length in minutes
const IP_WINDOW_MINUTES: i64 = 1;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by username
    username_attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    /// Login requests by IP address
    ip_attempts: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            username_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check if a username has exhausted its failed-attempt budget
    pub async fn is_username_limited(&self, username: &str) -> bool {
        let mut attempts = self.username_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(USERNAME_WINDOW_MINUTES);

        let entry = attempts.entry(username.to_lowercase()).or_default();
        entry.retain(|time| *time > cutoff);

        entry.len() >= USERNAME_MAX_ATTEMPTS
    }

    /// Record a failed login attempt for a username
    pub async fn record_failed_attempt(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts
            .entry(username.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Clear failed attempts for a username (on successful login)
    pub async fn clear_username_attempts(&self, username: &str) {
        let mut attempts = self.username_attempts.write().await;
        attempts.remove(&username.to_lowercase());
    }

    /// Check if an IP has exhausted its request budget
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let mut attempts = self.ip_attempts.write().await;
        let cutoff = Utc::now() - Duration::minutes(IP_WINDOW_MINUTES);

        let entry = attempts.entry(ip).or_default();
        entry.retain(|time| *time > cutoff);

        entry.len() >= IP_MAX_REQUESTS
    }

    /// Record a login request from an IP
    pub async fn record_ip_request(&self, ip: IpAddr) {
        let mut attempts = self.ip_attempts.write().await;
        attempts.entry(ip).or_default().push(Utc::now());
    }

    /// Drop entries whose windows have fully elapsed. Called periodically so
    /// one-off usernames and IPs don't accumulate forever.
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let username_cutoff = now - Duration::minutes(USERNAME_WINDOW_MINUTES);
        let ip_cutoff = now - Duration::minutes(IP_WINDOW_MINUTES);

        {
            let mut attempts = self.username_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > username_cutoff);
                !times.is_empty()
            });
        }

        {
            let mut attempts = self.ip_attempts.write().await;
            attempts.retain(|_, times| {
                times.retain(|time| *time > ip_cutoff);
                !times.is_empty()
            });
        }
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn username_lockout_after_repeated_failures() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_username_limited("newsdesk").await);
            limiter.record_failed_attempt("newsdesk").await;
        }

        limiter.record_failed_attempt("newsdesk").await;
        assert!(limiter.is_username_limited("newsdesk").await);

        // Successful login clears the slate
        limiter.clear_username_attempts("newsdesk").await;
        assert!(!limiter.is_username_limited("newsdesk").await);
    }

    #[tokio::test]
    async fn ip_throttle_counts_every_request() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();

        for _ in 0..9 {
            assert!(!limiter.is_ip_limited(ip).await);
            limiter.record_ip_request(ip).await;
        }

        limiter.record_ip_request(ip).await;
        assert!(limiter.is_ip_limited(ip).await);
    }

    #[tokio::test]
    async fn username_matching_ignores_case() {
        let limiter = LoginRateLimiter::new();

        limiter.record_failed_attempt("NewsDesk").await;
        limiter.record_failed_attempt("newsdesk").await;
        limiter.record_failed_attempt("NEWSDESK").await;

        assert!(!limiter.is_username_limited("newsdesk").await);
        limiter.record_failed_attempt("newsdesk").await;
        limiter.record_failed_attempt("newsdesk").await;
        assert!(limiter.is_username_limited("NewsDesk").await);
    }

    #[tokio::test]
    async fn usernames_are_tracked_independently() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..USERNAME_MAX_ATTEMPTS {
            limiter.record_failed_attempt("newsdesk").await;
        }

        assert!(limiter.is_username_limited("newsdesk").await);
        assert!(!limiter.is_username_limited("sports-desk").await);
    }

    #[tokio::test]
    async fn cleanup_keeps_recent_entries() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("10.0.0.1").unwrap();

        limiter.record_failed_attempt("newsdesk").await;
        limiter.record_ip_request(ip).await;

        limiter.cleanup().await;

        // Fresh entries survive a cleanup pass
        assert_eq!(limiter.username_attempts.read().await.len(), 1);
        assert_eq!(limiter.ip_attempts.read().await.len(), 1);
    }
}
