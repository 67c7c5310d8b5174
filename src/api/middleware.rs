//! API middleware
//!
//! Session authentication, role gates, the JSON error envelope and request
//! statistics. `require_auth` resolves the session token and parks the user
//! in request extensions; handlers pick it up through the
//! [`AuthenticatedUser`] extractor.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::repositories::MediaRepository;
use crate::models::{User, UserRole};
use crate::services::{
    EmailService, LoginRateLimiter, NewsletterService, PodcastService, PostService, UserService,
};
use crate::storage::DynMediaStorage;

/// Lock-free request counters for the health endpoint
pub struct RequestStats {
    total_requests: AtomicU64,
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        match self.total_requests.load(Ordering::Relaxed) {
            0 => 0.0,
            n => self.total_response_time_us.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub podcast_service: Arc<PodcastService>,
    pub newsletter_service: Arc<NewsletterService>,
    pub email_service: Arc<EmailService>,
    pub media_repo: Arc<dyn MediaRepository>,
    pub storage: DynMediaStorage,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub request_stats: Arc<RequestStats>,
}

/// The user `require_auth` resolved for this request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Machine-readable error codes; each maps to exactly one HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    Conflict,
    RateLimit,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error envelope: `{"error": {"code", "message", "details"}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.error.code.status(), Json(self)).into_response()
    }
}

/// Pull the session token off a request: `Authorization: Bearer` wins,
/// then the `session` cookie.
fn extract_session_token(request: &Request) -> Option<String> {
    let headers = request.headers();

    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("session="))
        .map(str::to_string)
}

/// Authentication middleware: resolves the token to a user and stores it in
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Session validation failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Shared body of the role middlewares. Runs after `require_auth`, so a
/// missing extension means the route was wired without it.
fn check_role(
    request: &Request,
    allowed: fn(&User) -> bool,
    denial: &'static str,
) -> Result<(), ApiError> {
    let AuthenticatedUser(user) = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if allowed(user) {
        Ok(())
    } else {
        Err(ApiError::forbidden(denial))
    }
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(
        &request,
        |u| u.role == UserRole::Admin,
        "Admin privileges required",
    )?;
    Ok(next.run(request).await)
}

pub async fn require_editor(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, User::is_editor, "Editor privileges required")?;
    Ok(next.run(request).await)
}

/// Outermost layer; feeds the health endpoint's counters.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    fn request_with_headers(headers: &[(header::HeaderName, String)]) -> Request<Body> {
        let mut builder = Request::builder().uri("/any");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_token_is_extracted() {
        let request =
            request_with_headers(&[(header::AUTHORIZATION, "Bearer tok-abc".to_string())]);
        assert_eq!(extract_session_token(&request), Some("tok-abc".to_string()));
    }

    #[test]
    fn session_cookie_is_extracted_among_other_cookies() {
        let request = request_with_headers(&[(
            header::COOKIE,
            "theme=dark; session=tok-cookie; lang=so".to_string(),
        )]);
        assert_eq!(
            extract_session_token(&request),
            Some("tok-cookie".to_string())
        );
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let request = request_with_headers(&[
            (header::AUTHORIZATION, "Bearer from-header".to_string()),
            (header::COOKIE, "session=from-cookie".to_string()),
        ]);
        assert_eq!(
            extract_session_token(&request),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn no_credentials_yields_none() {
        let bare = request_with_headers(&[]);
        assert!(extract_session_token(&bare).is_none());

        let basic = request_with_headers(&[(header::AUTHORIZATION, "Basic abc".to_string())]);
        assert!(extract_session_token(&basic).is_none());
    }

    #[test]
    fn error_codes_map_to_statuses() {
        assert_eq!(ErrorCode::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ValidationError.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::RateLimit.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_envelope_serializes_screaming_snake_codes() {
        let error = ApiError::with_details(
            ErrorCode::ValidationError,
            "Invalid",
            serde_json::json!({"field": "username"}),
        );

        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "Invalid");
        assert_eq!(json["error"]["details"]["field"], "username");

        // details are omitted entirely when absent
        let bare = serde_json::to_value(ApiError::not_found("gone")).unwrap();
        assert_eq!(bare["error"]["code"], "NOT_FOUND");
        assert!(bare["error"].get("details").is_none());
    }

    #[test]
    fn stats_average_over_recorded_requests() {
        let stats = RequestStats::new();
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);

        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }
}
