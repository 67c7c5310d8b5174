//! Podcast API endpoints
//!
//! Public read access to published episodes; episode management is
//! admin-only. Episode audio is uploaded through the media endpoint first
//! and referenced here by URL.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PagedResponse, PodcastResponse};
use crate::models::{CreatePodcastInput, PostStatus, UpdatePodcastInput};
use crate::services::PodcastServiceError;

/// Request body for creating an episode
#[derive(Debug, Deserialize)]
pub struct CreatePodcastRequest {
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

fn map_err(e: PodcastServiceError) -> ApiError {
    match e {
        PodcastServiceError::NotFound => ApiError::not_found("Podcast not found"),
        PodcastServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        PodcastServiceError::DuplicateSlug(slug) => {
            ApiError::conflict(format!("Slug already exists: {}", slug))
        }
        PodcastServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /api/v1/podcasts - List published episodes
pub async fn list_podcasts_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<PodcastResponse>>, ApiError> {
    let result = state
        .podcast_service
        .list_published(&query.params())
        .await
        .map_err(map_err)?;

    Ok(Json(PagedResponse::from_result(result)))
}

/// GET /api/v1/podcasts/{slug} - Get a published episode by slug
pub async fn get_podcast_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PodcastResponse>, ApiError> {
    let podcast = state
        .podcast_service
        .get_by_slug(&slug)
        .await
        .map_err(map_err)?
        .filter(|p| p.status == PostStatus::Published)
        .ok_or_else(|| ApiError::not_found(format!("Podcast not found: {}", slug)))?;

    Ok(Json(podcast.into()))
}

/// GET /api/v1/admin/podcasts - List all episodes including drafts
pub async fn list_all_podcasts_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<PodcastResponse>>, ApiError> {
    let result = state
        .podcast_service
        .list(&query.params())
        .await
        .map_err(map_err)?;

    Ok(Json(PagedResponse::from_result(result)))
}

/// POST /api/v1/admin/podcasts - Create an episode
pub async fn create_podcast_handler(
    State(state): State<AppState>,
    Json(body): Json<CreatePodcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreatePodcastInput {
        slug: body.slug,
        title: body.title,
        description: body.description,
        audio_url: body.audio_url,
        duration_secs: body.duration_secs,
        cover_image: body.cover_image,
        status: body.status,
    };

    let podcast = state
        .podcast_service
        .create(input)
        .await
        .map_err(map_err)?;

    Ok((StatusCode::CREATED, Json(PodcastResponse::from(podcast))))
}

/// PUT /api/v1/admin/podcasts/{id} - Update an episode
pub async fn update_podcast_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdatePodcastInput>,
) -> Result<Json<PodcastResponse>, ApiError> {
    let podcast = state
        .podcast_service
        .update(id, input)
        .await
        .map_err(map_err)?;

    Ok(Json(podcast.into()))
}

/// DELETE /api/v1/admin/podcasts/{id} - Delete an episode
pub async fn delete_podcast_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.podcast_service.delete(id).await.map_err(map_err)?;

    Ok(StatusCode::NO_CONTENT)
}
