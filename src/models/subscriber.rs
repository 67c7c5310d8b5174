//! Newsletter subscriber model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newsletter subscriber entity.
///
/// Emails are stored normalized (trimmed, lowercased); the unsubscribe token
/// is not stored - it is an HMAC over the normalized email and is recomputed
/// on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    /// Unique identifier
    pub id: i64,
    /// Normalized email address (unique)
    pub email: String,
    /// Subscription status
    pub status: SubscriberStatus,
    /// When the subscription was created
    pub subscribed_at: DateTime<Utc>,
    /// When the subscriber opted out, if they did
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Receiving campaigns
    #[default]
    Active,
    /// Opted out; kept for suppression
    Unsubscribed,
}

impl SubscriberStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(SubscriberStatus::Active),
            "unsubscribed" => Some(SubscriberStatus::Unsubscribed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
