//! Authentication API endpoints
//!
//! Registration, session login/logout and the password-reset flow. Login is
//! rate limited per username and per source IP. The reset-request endpoint
//! always answers 200 so the response never reveals whether an email is
//! registered.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, ErrorCode};
use crate::api::responses::UserResponse;
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

/// Session cookie lifetime, matching the server-side session expiration
const SESSION_COOKIE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Request body for requesting a password reset
#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub email: String,
}

/// Request body for confirming a password reset
#[derive(Debug, Deserialize)]
pub struct ResetConfirmBody {
    pub token: String,
    pub new_password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

fn session_cookie(token: &str, max_age: u64) -> HeaderMap {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token, max_age
    );

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}

/// POST /api/v1/auth/register - User registration
///
/// The first registered user becomes the administrator. A session is
/// created immediately so the client is logged in after signup.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let input = RegisterInput::new(body.username, body.email, body.password);

    let user = state
        .user_service
        .register(input)
        .await
        .map_err(|e| match e {
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            _ => ApiError::internal_error(e.to_string()),
        })?;

    let session = state
        .user_service
        .login(LoginInput::new(&user.username, &password))
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        session_cookie(&session.id, SESSION_COOKIE_MAX_AGE_SECS),
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login - User login
///
/// Accepts a username or email. Failed attempts count against the username
/// window; every request counts against the source IP window.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_ip_address(&headers).and_then(|s| s.parse().ok()) {
        if state.rate_limiter.is_ip_limited(ip).await {
            return Err(ApiError::with_details(
                ErrorCode::RateLimit,
                "Too many requests, please try again later",
                serde_json::json!({"retry_after": 60}),
            ));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }

    if state
        .rate_limiter
        .is_username_limited(&body.username_or_email)
        .await
    {
        return Err(ApiError::with_details(
            ErrorCode::RateLimit,
            "Too many failed login attempts, please try again later",
            serde_json::json!({"retry_after": 900}),
        ));
    }

    let input = LoginInput::new(body.username_or_email.clone(), body.password);

    let session = match state.user_service.login(input).await {
        Ok(session) => session,
        Err(e) => {
            state
                .rate_limiter
                .record_failed_attempt(&body.username_or_email)
                .await;

            return Err(match e {
                UserServiceError::AuthenticationError(_) => {
                    ApiError::unauthorized("Invalid username or password")
                }
                _ => ApiError::internal_error("Login failed"),
            });
        }
    };

    let user = state
        .user_service
        .validate_session(&session.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::internal_error("Session validation failed"))?;

    state
        .rate_limiter
        .clear_username_attempts(&body.username_or_email)
        .await;

    Ok((
        session_cookie(&session.id, SESSION_COOKIE_MAX_AGE_SECS),
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout - User logout
///
/// Requires authentication. Deletes the session and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| {
            s.split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("session="))
        })
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state
        .user_service
        .logout(token)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok((StatusCode::NO_CONTENT, session_cookie("", 0)))
}

/// GET /api/v1/auth/me - Get current user
pub async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// POST /api/v1/auth/password-reset/request - Request a reset email
///
/// Always returns 202 with the same body, whether or not the email is
/// registered. The mail send itself is best effort and only logged.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    match state.user_service.request_password_reset(&body.email).await {
        Ok(Some((user, token))) => {
            if let Err(e) = state.email_service.send_password_reset(&user.email, &token).await {
                warn!(error = %e, "password reset email failed to send");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "password reset request failed"),
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "If that email is registered, a reset link has been sent"
        })),
    ))
}

/// POST /api/v1/auth/password-reset/confirm - Redeem a reset token
///
/// The token is single use and expires; on success all existing sessions
/// for the user are invalidated.
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetConfirmBody>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .confirm_password_reset(&body.token, &body.new_password)
        .await
        .map_err(|e| match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            _ => ApiError::internal_error(e.to_string()),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Extract the client IP from proxy headers (X-Forwarded-For, X-Real-IP)
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return Some(ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ip_from_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(
            extract_ip_address(&headers),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_extract_ip_from_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        assert_eq!(
            extract_ip_address(&headers),
            Some("198.51.100.4".to_string())
        );
    }

    #[test]
    fn test_extract_ip_missing() {
        assert!(extract_ip_address(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_session_cookie_flags() {
        let headers = session_cookie("abc", 60);
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();

        assert!(cookie.contains("session=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
    }
}
