//! Newsletter API endpoints
//!
//! Public subscribe and one-click unsubscribe, plus an admin subscriber
//! listing. Unsubscribe arrives as a GET because the link lives in an email
//! footer; it is authenticated by the HMAC token instead of a session.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::SubscriberResponse;
use crate::services::NewsletterServiceError;

/// Request body for subscribing
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Query parameters carried by the unsubscribe link
#[derive(Debug, Deserialize)]
pub struct UnsubscribeQuery {
    pub email: String,
    pub token: String,
}

/// Admin view of the subscriber list
#[derive(Debug, Serialize)]
pub struct SubscriberListResponse {
    pub subscribers: Vec<SubscriberResponse>,
    pub active_count: i64,
}

fn map_err(e: NewsletterServiceError) -> ApiError {
    match e {
        NewsletterServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        NewsletterServiceError::InvalidToken => {
            ApiError::unauthorized("Invalid unsubscribe token")
        }
        NewsletterServiceError::NotFound => ApiError::not_found("Subscriber not found"),
        NewsletterServiceError::InternalError(e) => ApiError::internal_error(e.to_string()),
    }
}

/// POST /api/v1/newsletter/subscribe - Subscribe an email address
///
/// Public and idempotent: re-subscribing an active address or a previously
/// unsubscribed one both succeed.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber = state
        .newsletter_service
        .subscribe(&body.email)
        .await
        .map_err(map_err)?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriberResponse::from(subscriber)),
    ))
}

/// GET /api/v1/newsletter/unsubscribe?email=&token= - One-click unsubscribe
///
/// Public. The token is verified before any database lookup.
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .newsletter_service
        .unsubscribe(&query.email, &query.token)
        .await
        .map_err(map_err)?;

    Ok(Json(serde_json::json!({
        "message": "You have been unsubscribed"
    })))
}

/// GET /api/v1/admin/newsletter/subscribers - List active subscribers
pub async fn list_subscribers_handler(
    State(state): State<AppState>,
) -> Result<Json<SubscriberListResponse>, ApiError> {
    let subscribers = state
        .newsletter_service
        .list_active()
        .await
        .map_err(map_err)?;
    let active_count = state
        .newsletter_service
        .count_active()
        .await
        .map_err(map_err)?;

    Ok(Json(SubscriberListResponse {
        subscribers: subscribers.into_iter().map(Into::into).collect(),
        active_count,
    }))
}
