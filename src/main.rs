//! Dawan - news and media publishing backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dawan::{
    api::{self, AppState, RequestStats},
    audio::{AudioPipeline, HttpTtsClient},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{
            SqlxMediaRepository, SqlxPodcastRepository, SqlxPostRepository,
            SqlxSessionRepository, SqlxSubscriberRepository, SqlxUserRepository,
        },
    },
    services::{
        EmailService, LoginRateLimiter, NewsletterService, PodcastService, PostService,
        UserService,
    },
    storage::LocalStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dawan=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dawan publishing backend...");

    let config = Arc::new(Config::load_with_env(Path::new("config.yml"))?);
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let cache = create_cache(&config.cache).await?;
    tracing::info!("Cache initialized");

    let storage = LocalStorage::boxed(
        config.storage.path.clone(),
        config.storage.url_prefix.clone(),
    );

    // Repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let podcast_repo = SqlxPodcastRepository::boxed(pool.clone());
    let subscriber_repo = SqlxSubscriberRepository::boxed(pool.clone());
    let media_repo = SqlxMediaRepository::boxed(pool.clone());

    // Services
    let user_service = Arc::new(
        UserService::new(user_repo, session_repo)
            .with_reset_token_ttl(config.security.reset_token_ttl_minutes),
    );

    let mut post_service = PostService::new(post_repo, cache.clone());
    if config.tts.endpoint.is_empty() {
        tracing::info!("TTS endpoint not configured, spoken-audio generation disabled");
    } else {
        let synthesizer = Arc::new(HttpTtsClient::new(&config.tts));
        let pipeline = Arc::new(AudioPipeline::new(
            synthesizer,
            storage.clone(),
            config.tts.chunk_limit,
        ));
        post_service = post_service.with_audio(pipeline);
        tracing::info!(voice = %config.tts.voice, "Spoken-audio generation enabled");
    }
    let post_service = Arc::new(post_service);

    let podcast_service = Arc::new(PodcastService::new(podcast_repo));
    let newsletter_service = Arc::new(NewsletterService::new(
        subscriber_repo,
        config.security.token_secret.clone(),
    ));
    let email_service = Arc::new(EmailService::new(
        &config.smtp,
        config.server.public_url.clone(),
    )?);

    let rate_limiter = Arc::new(LoginRateLimiter::new());
    let request_stats = Arc::new(RequestStats::new());

    let state = AppState {
        config: config.clone(),
        user_service: user_service.clone(),
        post_service,
        podcast_service,
        newsletter_service,
        email_service,
        media_repo,
        storage,
        rate_limiter: rate_limiter.clone(),
        request_stats,
    };

    // Rate limiter sweep (every 5 minutes)
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Expired session sweep (hourly)
    {
        let users = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(count, "cleaned up expired sessions")
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "session cleanup failed"),
                }
            }
        });
    }

    let app = api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
