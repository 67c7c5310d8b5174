//! Podcast model
//!
//! Podcast episodes carry an uploaded audio file rather than generated
//! speech; otherwise they follow the same publish lifecycle as posts.

use crate::models::PostStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Podcast episode entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Episode title
    pub title: String,
    /// Episode description
    pub description: String,
    /// Audio file URL
    pub audio_url: String,
    /// Episode length in seconds
    pub duration_secs: Option<i64>,
    /// Cover image URL
    pub cover_image: Option<String>,
    /// Publication status (shares the post lifecycle)
    pub status: PostStatus,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new podcast episode
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePodcastInput {
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub audio_url: String,
    pub duration_secs: Option<i64>,
    pub cover_image: Option<String>,
    pub status: Option<PostStatus>,
}

/// Input for updating an existing podcast episode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePodcastInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub audio_url: Option<String>,
    pub duration_secs: Option<i64>,
    pub cover_image: Option<String>,
    pub status: Option<PostStatus>,
}

impl UpdatePodcastInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.description.is_some()
            || self.audio_url.is_some()
            || self.duration_secs.is_some()
            || self.cover_image.is_some()
            || self.status.is_some()
    }
}
