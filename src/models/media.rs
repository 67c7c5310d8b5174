//! Media item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An uploaded media file (image or audio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique identifier
    pub id: i64,
    /// Stored filename (uuid-based)
    pub filename: String,
    /// Public URL
    pub url: String,
    /// MIME type
    pub mime_type: String,
    /// Size in bytes
    pub size: i64,
    /// Uploading user ID
    pub uploader_id: i64,
    /// Upload timestamp
    pub created_at: DateTime<Utc>,
}
