//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints for the publishing backend:
//! - Post endpoints (public reads, authenticated writes)
//! - Podcast endpoints
//! - Auth endpoints (sessions, password reset)
//! - Newsletter endpoints (subscribe, one-click unsubscribe)
//! - Media upload endpoints
//! - Site info and health

pub mod auth;
pub mod common;
pub mod middleware;
pub mod newsletter;
pub mod podcasts;
pub mod posts;
pub mod responses;
pub mod site;
pub mod upload;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .route("/admin/posts", get(posts::list_all_posts_handler))
        .route("/admin/posts/{id}", get(posts::get_post_by_id_handler))
        .route("/admin/posts/{id}/audio", post(posts::regenerate_audio_handler))
        .route("/admin/posts/{id}/campaign", post(posts::send_campaign_handler))
        .route("/admin/podcasts", get(podcasts::list_all_podcasts_handler))
        .route("/admin/podcasts", post(podcasts::create_podcast_handler))
        .route("/admin/podcasts/{id}", put(podcasts::update_podcast_handler))
        .route("/admin/podcasts/{id}", delete(podcasts::delete_podcast_handler))
        .route("/admin/newsletter/subscribers", get(newsletter::list_subscribers_handler))
        .route("/admin/media", get(upload::list_media_handler))
        .route("/admin/media/{id}", delete(upload::delete_media_handler))
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .route("/posts", post(posts::create_post_handler))
        // Same param name as the public GET so the routes merge cleanly;
        // writes address posts by numeric id.
        .route("/posts/{slug}", put(posts::update_post_handler))
        .route("/posts/{slug}", delete(posts::delete_post_handler))
        .route("/upload", post(upload::upload_handler))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::get_current_user))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/posts", get(posts::list_posts_handler))
        .route("/posts/{slug}", get(posts::get_post_handler))
        .route("/view/{id}", post(posts::increment_view_handler))
        .route("/podcasts", get(podcasts::list_podcasts_handler))
        .route("/podcasts/{slug}", get(podcasts::get_podcast_handler))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/password-reset/request", post(auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(auth::confirm_password_reset))
        .route("/newsletter/subscribe", post(newsletter::subscribe_handler))
        .route("/newsletter/unsubscribe", get(newsletter::unsubscribe_handler))
        .route("/site/info", get(site::get_site_info))
        .route("/site/health", get(site::health))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .server
                .cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    // Uploaded media (post audio included) is served straight from disk
    let uploads = ServeDir::new(&state.config.storage.path);
    let uploads_prefix = state.config.storage.url_prefix.clone();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(&uploads_prefix, uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
