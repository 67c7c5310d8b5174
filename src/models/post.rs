//! Post model
//!
//! This module provides:
//! - `Post` entity representing a published article
//! - `PostStatus` enum for publication states
//! - Input types for creating and updating posts
//! - Pagination types for list queries
//!
//! Post bodies are Lexical rich-text documents stored as JSON; the backend
//! never renders them to HTML, but it does walk them to extract the spoken
//! text for audio generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug
    pub slug: String,
    /// Post title
    pub title: String,
    /// Lexical rich-text document (JSON tree)
    pub content: serde_json::Value,
    /// Short plain-text excerpt for listings
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Cover image URL
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Author user ID
    pub author_id: i64,
    /// Publication status
    pub status: PostStatus,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// URL of the generated spoken-article audio, if any
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Fingerprint of the spoken text the current audio was generated from
    #[serde(default, skip_serializing)]
    pub content_hash: Option<String>,
    /// View count
    #[serde(default)]
    pub view_count: i64,
    /// Like count
    #[serde(default)]
    pub like_count: i64,
}

impl Post {
    /// Create a new post with the given parameters
    pub fn new(
        slug: String,
        title: String,
        content: serde_json::Value,
        author_id: i64,
        status: PostStatus,
    ) -> Self {
        let now = Utc::now();
        let published_at = if status == PostStatus::Published {
            Some(now)
        } else {
            None
        };

        Self {
            id: 0, // Will be set by database
            slug,
            title,
            content,
            excerpt: None,
            cover_image: None,
            author_id,
            status,
            published_at,
            created_at: now,
            updated_at: now,
            audio_url: None,
            content_hash: None,
            view_count: 0,
            like_count: 0,
        }
    }
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Draft - not visible to public
    #[default]
    Draft,
    /// Published - visible to public
    Published,
    /// Archived - hidden but not deleted
    Archived,
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Archived => "archived",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    /// URL-friendly slug (generated from the title when empty)
    #[serde(default)]
    pub slug: String,
    /// Post title
    pub title: String,
    /// Lexical rich-text document
    pub content: serde_json::Value,
    /// Short excerpt (optional)
    pub excerpt: Option<String>,
    /// Cover image URL (optional)
    pub cover_image: Option<String>,
    /// Author user ID
    pub author_id: i64,
    /// Publication status (defaults to Draft)
    pub status: Option<PostStatus>,
}

/// Input for updating an existing post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    /// New slug (optional)
    pub slug: Option<String>,
    /// New title (optional)
    pub title: Option<String>,
    /// New rich-text content (optional)
    pub content: Option<serde_json::Value>,
    /// New excerpt (optional)
    pub excerpt: Option<String>,
    /// New cover image URL (optional)
    pub cover_image: Option<String>,
    /// New status (optional)
    pub status: Option<PostStatus>,
}

impl UpdatePostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.slug.is_some()
            || self.title.is_some()
            || self.content.is_some()
            || self.excerpt.is_some()
            || self.cover_image.is_some()
            || self.status.is_some()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_published_post_gets_published_at() {
        let post = Post::new(
            "hello".into(),
            "Hello".into(),
            serde_json::json!({"root": {"children": []}}),
            1,
            PostStatus::Published,
        );
        assert!(post.published_at.is_some());
    }

    #[test]
    fn new_draft_post_has_no_published_at() {
        let post = Post::new(
            "hello".into(),
            "Hello".into(),
            serde_json::json!({"root": {"children": []}}),
            1,
            PostStatus::Draft,
        );
        assert!(post.published_at.is_none());
        assert!(post.audio_url.is_none());
    }

    #[test]
    fn status_roundtrip() {
        for status in [PostStatus::Draft, PostStatus::Published, PostStatus::Archived] {
            assert_eq!(PostStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(PostStatus::from_str("bogus"), None);
    }

    #[test]
    fn list_params_clamp_and_offset() {
        let params = ListParams::new(0, 1000);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);

        let params = ListParams::new(3, 20);
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn paged_result_pages() {
        let params = ListParams::new(1, 10);
        let result = PagedResult::new(vec![1, 2, 3], 25, &params);
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(!result.has_prev());
    }
}
