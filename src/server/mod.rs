//! HTTP API around the transcript pipeline
//!
//! Routes, per-client rate limiting, `X-API-Key` authentication and CORS.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod error;
pub mod handlers;
pub mod limits;

use crate::config::Config;
use crate::transcript::TranscriptService;
use auth::ApiKey;
use limits::RateLimiter;

/// How often idle rate-limit entries are evicted
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Application state shared across all handlers
pub struct AppState {
    pub service: TranscriptService,
    pub limiter: Arc<RateLimiter>,
    pub api_key: ApiKey,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config, service: TranscriptService) -> Self {
        Self {
            service,
            limiter: Arc::new(RateLimiter::new(config.server.rate_limit)),
            api_key: ApiKey::new(config.server.api_key.clone()),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

/// Build the router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Layers added later run first: rate limit, then authentication
    let protected = Router::new()
        .route("/transcript/{video_id}", get(handlers::transcript_by_id))
        .route("/transcript", post(handlers::transcript_by_url))
        .route("/debug/{video_id}", get(handlers::debug_tracks))
        .route_layer(middleware::from_fn_with_state(
            state.api_key.clone(),
            auth::require_api_key,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limits::rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Request logging middleware
async fn request_logger(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        tracing::info!("{} {} {} in {:?}", method, uri, status, duration);
    } else {
        tracing::warn!("{} {} {} in {:?}", method, uri, status, duration);
    }

    response
}

/// Run the HTTP server until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let service = TranscriptService::new(config.captions.clone());
    let state = Arc::new(AppState::new(&config, service));

    if !state.api_key.is_configured() {
        tracing::warn!("API key not configured - transcript endpoints are unprotected");
    }

    // Background task: evict idle rate-limit entries
    {
        let limiter = Arc::clone(&state.limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let removed = limiter.cleanup(Duration::from_secs(3600));
                if removed > 0 {
                    tracing::debug!("Evicted {} idle rate-limit entries", removed);
                }
            }
        });
    }

    let app = create_router(state);

    let addr: SocketAddr = config
        .server
        .socket_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.socket_addr()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Starting HTTP server on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
