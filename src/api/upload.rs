//! Media upload API endpoints
//!
//! Uploads go through the storage backend and are recorded in the media
//! table with the uploader. MIME type and size limits come from the storage
//! config.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::MediaResponse;

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
}

/// Subdirectory for a MIME type, grouping files by kind on disk
fn subdir_for(mime_type: &str) -> &'static str {
    if mime_type.starts_with("audio/") {
        "audio"
    } else {
        "images"
    }
}

/// POST /api/v1/upload - Upload a single file
///
/// Requires authentication. Accepts multipart/form-data with a field named
/// "file". The MIME type must be on the configured allow-list.
pub async fn upload_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = &state.config.storage;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&mime_type) {
            return Err(ApiError::validation_error(format!(
                "File type not allowed: {}",
                mime_type
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large, maximum is {} bytes",
                config.max_file_size
            )));
        }

        let stored = state
            .storage
            .put(subdir_for(&mime_type), config.get_extension(&mime_type), &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to store file: {}", e)))?;

        let item = state
            .media_repo
            .create(
                &stored.filename,
                &stored.url,
                &mime_type,
                data.len() as i64,
                user.0.id,
            )
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?;

        return Ok(Json(UploadResponse {
            id: item.id,
            url: item.url,
            filename: item.filename,
            size: data.len() as u64,
            mime_type,
        }));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// Paginated media listing
#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub items: Vec<MediaResponse>,
    pub total: i64,
}

/// GET /api/v1/admin/media - List uploaded media, newest first
pub async fn list_media_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<MediaListResponse>, ApiError> {
    let params = query.params();

    let items = state
        .media_repo
        .list(params.offset(), params.limit())
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let total = state
        .media_repo
        .count()
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(MediaListResponse {
        items: items.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// DELETE /api/v1/admin/media/{id} - Delete an uploaded file
///
/// Removes the record first, then the file. A file that is already gone
/// from disk only warns.
pub async fn delete_media_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let item = state
        .media_repo
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Media not found: {}", id)))?;

    state
        .media_repo
        .delete(id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    if let Err(e) = state.storage.delete(&item.url).await {
        warn!(url = %item.url, error = %e, "failed to remove media file from storage");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_and_images_use_separate_subdirs() {
        assert_eq!(subdir_for("audio/mpeg"), "audio");
        assert_eq!(subdir_for("audio/wav"), "audio");
        assert_eq!(subdir_for("image/png"), "images");
        assert_eq!(subdir_for("application/octet-stream"), "images");
    }
}
