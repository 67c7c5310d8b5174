//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A login session: the opaque token sent as cookie or Bearer header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The token itself; random uuid minted at login
    pub id: String,
    /// Owning user
    pub user_id: i64,
    /// When this token stops being honored
    pub expires_at: DateTime<Utc>,
    /// When it was minted
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_check() {
        let live = Session {
            id: "t".into(),
            user_id: 1,
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        };
        let dead = Session {
            expires_at: Utc::now() - Duration::hours(1),
            ..live.clone()
        };
        assert!(!live.is_expired());
        assert!(dead.is_expired());
    }
}
