//! Post service
//!
//! Business logic for posts: validation, slug generation and uniqueness,
//! cache invalidation on writes, atomic view counting, and the spoken-audio
//! lifecycle. Audio is kept in sync with the post content for published
//! posts: the spoken-text fingerprint decides whether a write triggers
//! regeneration, and deleting a post purges its audio. Audio failures are
//! logged and never block the post write.

use crate::audio::{AudioOutcome, AudioPipeline};
use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::PostRepository;
use crate::models::{CreatePostInput, ListParams, PagedResult, Post, PostStatus, UpdatePostInput};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Cache TTL for individual posts (1 hour)
const POST_CACHE_TTL_SECS: u64 = 3600;

/// Cache TTL for post lists (10 minutes)
const POST_LIST_CACHE_TTL_SECS: u64 = 600;

const CACHE_KEY_POST_BY_ID: &str = "post:id:";
const CACHE_KEY_POST_BY_SLUG: &str = "post:slug:";
const CACHE_KEY_POST_LIST: &str = "posts:list";

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found")]
    NotFound,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already in use
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
    audio: Option<Arc<AudioPipeline>>,
    cache_ttl: Duration,
}

impl PostService {
    /// Create a new post service. Audio generation is off until a pipeline
    /// is attached with [`with_audio`](Self::with_audio).
    pub fn new(repo: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        Self {
            repo,
            cache,
            audio: None,
            cache_ttl: Duration::from_secs(POST_CACHE_TTL_SECS),
        }
    }

    /// Attach the spoken-audio pipeline
    pub fn with_audio(mut self, audio: Arc<AudioPipeline>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Create a new post.
    ///
    /// An empty slug is generated from the title. Published posts get their
    /// audio generated before the call returns.
    pub async fn create(&self, mut input: CreatePostInput) -> Result<Post, PostServiceError> {
        self.validate_create_input(&input)?;

        if input.slug.trim().is_empty() {
            input.slug = generate_slug(&input.title);
        }

        if self
            .repo
            .exists_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(PostServiceError::DuplicateSlug(input.slug));
        }

        let post = self
            .repo
            .create(&input)
            .await
            .context("Failed to create post")?;

        let post = self.sync_audio(post).await;

        self.invalidate_list_cache().await;

        Ok(post)
    }

    /// Get post by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_ID, id);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(Some(post));
        }

        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?;

        if let Some(ref p) = post {
            let _ = self.cache.set(&cache_key, p, self.cache_ttl).await;
        }

        Ok(post)
    }

    /// Get post by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(Some(post));
        }

        let post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?;

        if let Some(ref p) = post {
            let _ = self.cache.set(&cache_key, p, self.cache_ttl).await;
        }

        Ok(post)
    }

    /// List all posts regardless of status (admin view, uncached)
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Post>, PostServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let total = self.repo.count().await.context("Failed to count posts")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// List published posts with pagination, cached per page
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let cache_key = format!(
            "{}:published:{}:{}",
            CACHE_KEY_POST_LIST,
            params.offset(),
            params.limit()
        );
        if let Ok(Some(cached)) = self.cache.get::<PagedResult<Post>>(&cache_key).await {
            return Ok(cached);
        }

        let items = self
            .repo
            .list_published(params.offset(), params.limit())
            .await
            .context("Failed to list published posts")?;
        let total = self
            .repo
            .count_published()
            .await
            .context("Failed to count published posts")?;

        let result = PagedResult::new(items, total, params);

        let _ = self
            .cache
            .set(
                &cache_key,
                &result,
                Duration::from_secs(POST_LIST_CACHE_TTL_SECS),
            )
            .await;

        Ok(result)
    }

    /// Full-text-ish search over published posts (title and excerpt)
    pub async fn search(
        &self,
        keyword: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(PagedResult::new(Vec::new(), 0, params));
        }

        let items = self
            .repo
            .search(keyword, params.offset(), params.limit())
            .await
            .context("Failed to search posts")?;
        let total = self
            .repo
            .count_search(keyword)
            .await
            .context("Failed to count search results")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Update a post.
    ///
    /// Published-at transitions are handled by the repository; the audio
    /// lifecycle runs after the write so a changed body regenerates audio
    /// and an emptied one purges it.
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let existing = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        self.validate_update_input(&input)?;

        if let Some(ref slug) = input.slug {
            if self
                .repo
                .exists_by_slug_excluding(slug, id)
                .await
                .context("Failed to check slug uniqueness")?
            {
                return Err(PostServiceError::DuplicateSlug(slug.clone()));
            }
        }

        let updated = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update post")?;

        let updated = self.sync_audio(updated).await;

        self.invalidate_post_cache(id, &existing.slug).await;
        if existing.slug != updated.slug {
            self.invalidate_post_cache(id, &updated.slug).await;
        }

        Ok(updated)
    }

    /// Delete a post and purge its audio
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        self.repo
            .delete(id)
            .await
            .context("Failed to delete post")?;

        if let (Some(pipeline), Some(url)) = (&self.audio, &post.audio_url) {
            pipeline.purge(url).await;
        }

        self.invalidate_post_cache(id, &post.slug).await;

        Ok(())
    }

    /// Atomically increment a post's view counter
    pub async fn increment_view(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        self.repo
            .increment_view(id)
            .await
            .context("Failed to increment view count")?;

        self.invalidate_post_cache(id, &post.slug).await;

        Ok(())
    }

    /// Force audio regeneration regardless of the stored fingerprint
    pub async fn regenerate_audio(&self, id: i64) -> Result<Post, PostServiceError> {
        let pipeline = self.audio.as_ref().ok_or_else(|| {
            PostServiceError::ValidationError("Audio generation is not configured".to_string())
        })?;

        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound)?;

        let generated = pipeline
            .generate(&post.content)
            .await
            .map_err(|e| PostServiceError::ValidationError(e.to_string()))?;

        if let Some(old_url) = &post.audio_url {
            if *old_url != generated.url {
                pipeline.purge(old_url).await;
            }
        }

        self.repo
            .set_audio(id, Some(&generated.url), Some(&generated.content_hash))
            .await
            .context("Failed to store audio URL")?;

        self.invalidate_post_cache(id, &post.slug).await;

        self.repo
            .get_by_id(id)
            .await
            .context("Failed to reload post")?
            .ok_or(PostServiceError::NotFound)
    }

    /// Count all posts
    pub async fn count(&self) -> Result<i64, PostServiceError> {
        let count = self.repo.count().await.context("Failed to count posts")?;
        Ok(count)
    }

    /// Count published posts
    pub async fn count_published(&self) -> Result<i64, PostServiceError> {
        let count = self
            .repo
            .count_published()
            .await
            .context("Failed to count published posts")?;
        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    /// Run the audio lifecycle for a post after a write.
    ///
    /// Only published posts carry audio. Failures are logged and the post is
    /// returned as written; the caller's transaction is never rolled back
    /// over a synthesis problem.
    async fn sync_audio(&self, mut post: Post) -> Post {
        let Some(pipeline) = &self.audio else {
            return post;
        };
        if post.status != PostStatus::Published {
            return post;
        }

        let outcome = pipeline
            .sync(
                &post.content,
                post.content_hash.as_deref(),
                post.audio_url.as_deref(),
            )
            .await;

        match outcome {
            Ok(AudioOutcome::Unchanged) => post,
            Ok(AudioOutcome::Updated(generated)) => {
                let stored = self
                    .repo
                    .set_audio(
                        post.id,
                        Some(&generated.url),
                        Some(&generated.content_hash),
                    )
                    .await;
                match stored {
                    Ok(()) => {
                        post.audio_url = Some(generated.url);
                        post.content_hash = Some(generated.content_hash);
                    }
                    Err(e) => {
                        error!(post_id = post.id, error = %e, "failed to persist audio URL");
                    }
                }
                post
            }
            Ok(AudioOutcome::Purged) => {
                if let Err(e) = self.repo.set_audio(post.id, None, None).await {
                    error!(post_id = post.id, error = %e, "failed to clear audio URL");
                } else {
                    post.audio_url = None;
                    post.content_hash = None;
                }
                post
            }
            Err(e) => {
                error!(post_id = post.id, error = %e, "audio generation failed");
                post
            }
        }
    }

    fn validate_create_input(&self, input: &CreatePostInput) -> Result<(), PostServiceError> {
        if input.title.trim().is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }

        if input.content.is_null() {
            return Err(PostServiceError::ValidationError(
                "Content cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_update_input(&self, input: &UpdatePostInput) -> Result<(), PostServiceError> {
        if let Some(ref title) = input.title {
            if title.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
        }

        if let Some(ref slug) = input.slug {
            if slug.trim().is_empty() {
                return Err(PostServiceError::ValidationError(
                    "Slug cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    async fn invalidate_post_cache(&self, id: i64, slug: &str) {
        let id_key = format!("{}{}", CACHE_KEY_POST_BY_ID, id);
        let _ = self.cache.delete(&id_key).await;

        let slug_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        let _ = self.cache.delete(&slug_key).await;

        self.invalidate_list_cache().await;
    }

    async fn invalidate_list_cache(&self) {
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_POST_LIST))
            .await;
    }
}

/// Generate a URL-friendly slug from a title.
///
/// Lowercases the title, maps runs of spaces and ASCII punctuation to single
/// hyphens, keeps non-ASCII characters as-is.
pub fn generate_slug(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || !c.is_ascii() {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}
