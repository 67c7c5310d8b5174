//! Post API endpoints
//!
//! Public read access to published posts plus authenticated write access.
//! Contributors can only touch their own posts; editors and admins can touch
//! any. Admin-only routes cover draft listings, forced audio regeneration
//! and newsletter campaigns.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PagedResponse, PostResponse, PostSummary};
use crate::models::{CreatePostInput, PostStatus, UpdatePostInput};
use crate::services::PostServiceError;

/// Request body for creating a post. The author is always the authenticated
/// user, never a field the client controls.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub slug: String,
    pub title: String,
    pub content: serde_json::Value,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<PostStatus>,
}

/// Request body for updating a post
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<serde_json::Value>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub status: Option<PostStatus>,
}

/// Query parameters for the public post listing.
///
/// Pagination fields are spelled out because `serde(flatten)` does not
/// survive the urlencoded deserializer for numeric fields.
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Optional full-text search over title and excerpt
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl ListPostsQuery {
    fn params(&self) -> crate::models::ListParams {
        crate::models::ListParams::new(self.page, self.per_page)
    }
}

/// Outcome of a newsletter campaign send
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub recipients: usize,
    pub sent: usize,
    pub failed: usize,
}

fn map_err(e: PostServiceError) -> ApiError {
    match e {
        PostServiceError::NotFound => ApiError::not_found("Post not found"),
        PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        PostServiceError::DuplicateSlug(slug) => {
            ApiError::conflict(format!("Slug already exists: {}", slug))
        }
        PostServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /api/v1/posts - List published posts
///
/// Public. Supports pagination and an optional `search` keyword.
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PagedResponse<PostSummary>>, ApiError> {
    let params = query.params();

    let result = match query.search.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => state
            .post_service
            .search(keyword, &params)
            .await
            .map_err(map_err)?,
        _ => state
            .post_service
            .list_published(&params)
            .await
            .map_err(map_err)?,
    };

    Ok(Json(PagedResponse::from_result(result)))
}

/// GET /api/v1/posts/{slug} - Get a published post by slug
///
/// Public. Drafts are not visible here regardless of who asks; authors use
/// the admin route to preview drafts.
pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await
        .map_err(map_err)?
        .filter(|p| p.status == PostStatus::Published)
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", slug)))?;

    Ok(Json(post.into()))
}

/// POST /api/v1/view/{id} - Record one view of a post
///
/// Public. Fire-and-forget from the client's perspective.
pub async fn increment_view_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .post_service
        .increment_view(id)
        .await
        .map_err(map_err)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/posts - Create a post
///
/// Requires authentication. Publishing a post triggers audio generation
/// before the response is returned.
pub async fn create_post_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreatePostInput {
        slug: body.slug,
        title: body.title,
        content: body.content,
        excerpt: body.excerpt,
        cover_image: body.cover_image,
        author_id: user.0.id,
        status: body.status,
    };

    let post = state.post_service.create(input).await.map_err(map_err)?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT /api/v1/posts/{id} - Update a post
///
/// Requires authentication and edit permission on the post.
pub async fn update_post_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let existing = state
        .post_service
        .get_by_id(id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    if !user.0.can_edit(existing.author_id) {
        return Err(ApiError::forbidden(
            "You don't have permission to edit this post",
        ));
    }

    let input = UpdatePostInput {
        slug: body.slug,
        title: body.title,
        content: body.content,
        excerpt: body.excerpt,
        cover_image: body.cover_image,
        status: body.status,
    };

    let post = state
        .post_service
        .update(id, input)
        .await
        .map_err(map_err)?;

    Ok(Json(post.into()))
}

/// DELETE /api/v1/posts/{id} - Delete a post
///
/// Requires authentication and edit permission. Generated audio is purged
/// along with the post.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let existing = state
        .post_service
        .get_by_id(id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    if !user.0.can_edit(existing.author_id) {
        return Err(ApiError::forbidden(
            "You don't have permission to delete this post",
        ));
    }

    state.post_service.delete(id).await.map_err(map_err)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/posts - List all posts including drafts
pub async fn list_all_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PagedResponse<PostSummary>>, ApiError> {
    let result = state
        .post_service
        .list(&query.params())
        .await
        .map_err(map_err)?;

    Ok(Json(PagedResponse::from_result(result)))
}

/// GET /api/v1/admin/posts/{id} - Get any post by ID, drafts included
pub async fn get_post_by_id_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get_by_id(id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    Ok(Json(post.into()))
}

/// POST /api/v1/admin/posts/{id}/audio - Force audio regeneration
///
/// Re-runs synthesis even when the spoken-text fingerprint is unchanged,
/// for voice or synthesis-backend changes.
pub async fn regenerate_audio_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .regenerate_audio(id)
        .await
        .map_err(map_err)?;

    Ok(Json(post.into()))
}

/// POST /api/v1/admin/posts/{id}/campaign - Email the post to subscribers
///
/// Sends the newsletter campaign for a published post to every active
/// subscriber. Per-recipient failures are counted, not fatal.
pub async fn send_campaign_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let post = state
        .post_service
        .get_by_id(id)
        .await
        .map_err(map_err)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    if post.status != PostStatus::Published {
        return Err(ApiError::validation_error(
            "Only published posts can be sent as a campaign",
        ));
    }

    let subscribers = state
        .newsletter_service
        .list_active()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let mut recipients = Vec::with_capacity(subscribers.len());
    for subscriber in &subscribers {
        let token = state
            .newsletter_service
            .unsubscribe_token(&subscriber.email)
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
        recipients.push((subscriber.email.clone(), token));
    }

    let report = state
        .email_service
        .send_post_campaign(
            &post.title,
            post.excerpt.as_deref(),
            &post.slug,
            &recipients,
        )
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(CampaignResponse {
        recipients: recipients.len(),
        sent: report.sent,
        failed: report.failed,
    }))
}
