//! Podcast service
//!
//! Episodes carry uploaded audio; no generation happens here. Otherwise the
//! rules mirror posts: slug generation and uniqueness, and only published
//! episodes appear in public listings.

use crate::db::repositories::PodcastRepository;
use crate::models::{
    CreatePodcastInput, ListParams, PagedResult, Podcast, UpdatePodcastInput,
};
use crate::services::post::generate_slug;
use anyhow::Context;
use std::sync::Arc;

/// Error types for podcast operations
#[derive(Debug, thiserror::Error)]
pub enum PodcastServiceError {
    /// Episode not found
    #[error("Podcast not found")]
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

/// Podcast episode service
pub struct PodcastService {
    repo: Arc<dyn PodcastRepository>,
}

impl PodcastService {
    pub fn new(repo: Arc<dyn PodcastRepository>) -> Self {
        Self { repo }
    }

    /// Create a new episode. An empty slug is generated from the title.
    pub async fn create(
        &self,
        mut input: CreatePodcastInput,
    ) -> Result<Podcast, PodcastServiceError> {
        if input.title.trim().is_empty() {
            return Err(PodcastServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.audio_url.trim().is_empty() {
            return Err(PodcastServiceError::ValidationError(
                "Audio URL cannot be empty".to_string(),
            ));
        }

        if input.slug.trim().is_empty() {
            input.slug = generate_slug(&input.title);
        }

        if self
            .repo
            .exists_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(PodcastServiceError::DuplicateSlug(input.slug));
        }

        let podcast = self
            .repo
            .create(&input)
            .await
            .context("Failed to create podcast")?;

        Ok(podcast)
    }

    /// Get episode by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Podcast>, PodcastServiceError> {
        let podcast = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get podcast")?;
        Ok(podcast)
    }

    /// Get episode by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Podcast>, PodcastServiceError> {
        let podcast = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get podcast by slug")?;
        Ok(podcast)
    }

    /// List all episodes regardless of status (admin view)
    pub async fn list(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Podcast>, PodcastServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list podcasts")?;
        let total = self
            .repo
            .count()
            .await
            .context("Failed to count podcasts")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// List published episodes with pagination
    pub async fn list_published(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<Podcast>, PodcastServiceError> {
        let items = self
            .repo
            .list_published(params.offset(), params.limit())
            .await
            .context("Failed to list published podcasts")?;
        let total = self
            .repo
            .count_published()
            .await
            .context("Failed to count published podcasts")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Update an episode
    pub async fn update(
        &self,
        id: i64,
        input: UpdatePodcastInput,
    ) -> Result<Podcast, PodcastServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get podcast")?
            .ok_or(PodcastServiceError::NotFound)?;

        if let Some(ref title) = input.title {
            if title.trim().is_empty() {
                return Err(PodcastServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
        }

        if let Some(ref slug) = input.slug {
            if let Some(existing) = self
                .repo
                .get_by_slug(slug)
                .await
                .context("Failed to check slug uniqueness")?
            {
                if existing.id != id {
                    return Err(PodcastServiceError::DuplicateSlug(slug.clone()));
                }
            }
        }

        let updated = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update podcast")?;

        Ok(updated)
    }

    /// Delete an episode
    pub async fn delete(&self, id: i64) -> Result<(), PodcastServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get podcast")?
            .ok_or(PodcastServiceError::NotFound)?;

        self.repo
            .delete(id)
            .await
            .context("Failed to delete podcast")?;

        Ok(())
    }
}
