//! Shared API response types
//!
//! Response DTOs used across endpoints. Timestamps go out as RFC 3339
//! strings; internal fields like password hashes and content fingerprints
//! never leave the server.

use serde::{Deserialize, Serialize};

use crate::models::{MediaItem, PagedResult, Podcast, Post, Subscriber, User};

/// Full post response
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Lexical editor state, passed through as-is
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub author_id: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub view_count: i64,
    pub like_count: i64,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            author_id: post.author_id,
            status: post.status.as_str().to_string(),
            audio_url: post.audio_url,
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            view_count: post.view_count,
            like_count: post.like_count,
        }
    }
}

/// Simplified post response for list views (no editor state)
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub view_count: i64,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            cover_image: post.cover_image,
            status: post.status.as_str().to_string(),
            audio_url: post.audio_url,
            published_at: post.published_at.map(|t| t.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            view_count: post.view_count,
        }
    }
}

/// Podcast episode response
#[derive(Debug, Serialize, Deserialize)]
pub struct PodcastResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
}

impl From<Podcast> for PodcastResponse {
    fn from(podcast: Podcast) -> Self {
        Self {
            id: podcast.id,
            slug: podcast.slug,
            title: podcast.title,
            description: podcast.description,
            audio_url: podcast.audio_url,
            duration_secs: podcast.duration_secs,
            cover_image: podcast.cover_image,
            status: podcast.status.as_str().to_string(),
            published_at: podcast.published_at.map(|t| t.to_rfc3339()),
            created_at: podcast.created_at.to_rfc3339(),
        }
    }
}

/// Newsletter subscriber response (admin listing)
#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub id: i64,
    pub email: String,
    pub status: String,
    pub subscribed_at: String,
}

impl From<Subscriber> for SubscriberResponse {
    fn from(subscriber: Subscriber) -> Self {
        Self {
            id: subscriber.id,
            email: subscriber.email,
            status: subscriber.status.as_str().to_string(),
            subscribed_at: subscriber.subscribed_at.to_rfc3339(),
        }
    }
}

/// User response (never exposes the password hash or reset token)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Uploaded media response
#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    pub created_at: String,
}

impl From<MediaItem> for MediaResponse {
    fn from(item: MediaItem) -> Self {
        Self {
            id: item.id,
            filename: item.filename,
            url: item.url,
            mime_type: item.mime_type,
            size: item.size,
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PagedResponse<T> {
    /// Map a service-layer page into response DTOs
    pub fn from_result<M: Into<T>>(result: PagedResult<M>) -> Self {
        let total_pages = result.total_pages();
        Self {
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
            items: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListParams, PostStatus, UserRole};
    use serde_json::json;

    fn sample_post() -> Post {
        Post::new(
            "port-expansion".to_string(),
            "Port Expansion Announced".to_string(),
            json!({"root": {"children": []}}),
            1,
            PostStatus::Published,
        )
    }

    #[test]
    fn post_response_hides_content_hash() {
        let mut post = sample_post();
        post.content_hash = Some("abc123".to_string());

        let response = PostResponse::from(post);
        let value = serde_json::to_value(&response).unwrap();

        assert!(value.get("content_hash").is_none());
        assert_eq!(value["slug"], "port-expansion");
    }

    #[test]
    fn user_response_hides_password_hash() {
        let user = User::new(
            "amina".to_string(),
            "amina@example.com".to_string(),
            "$argon2id$secret".to_string(),
            UserRole::Editor,
        );

        let value = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(value.get("password_hash").is_none());
        assert!(value.get("reset_token_hash").is_none());
        assert_eq!(value["role"], "editor");
    }

    #[test]
    fn paged_response_maps_items() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![sample_post()], 11, &params);

        let response: PagedResponse<PostSummary> = PagedResponse::from_result(result);

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.page, 2);
        assert_eq!(response.total_pages, 2);
    }
}
