//! HTTP front-end for the segmentation pipeline
//!
//! This module is only available when the "server" feature is enabled.
//!
//! Routes:
//! - `POST /segment`: multipart or raw image upload, answers with a
//!   [`SegmentationResponse`](crate::api::SegmentationResponse)
//! - `GET /health`: liveness probe naming the active scorer

pub mod config;
pub mod error;
pub mod handlers;
#[path = "main.rs"]
mod main_impl;

pub use config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{ApiError, ApiResult};
pub use handlers::{AppState, HealthResponse};
pub use main_impl::{main, ServerCli};

use crate::{error::Result, processor::SegmentationPipeline};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Build the application router
pub fn build_router(pipeline: Arc<SegmentationPipeline>, config: &ServerConfig) -> Router {
    let state = AppState { pipeline };

    let mut router = Router::new()
        .route("/segment", post(handlers::segment))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    if config.legacy_status {
        router = router.layer(middleware::map_response(handlers::force_ok_status));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
}

/// CORS layer from the configured origins
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            },
        })
        .collect();
    cors.allow_origin(origins)
}

/// Bind the listener and serve until Ctrl-C
///
/// # Errors
/// - Invalid server settings
/// - Bind or accept failures
pub async fn serve(config: ServerConfig, pipeline: Arc<SegmentationPipeline>) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;
    let app = build_router(pipeline, &config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %listener.local_addr()?,
        legacy_status = config.legacy_status,
        max_body_bytes = config.max_body_bytes,
        "Segmentation server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Segmentation server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
