//! HTTP layer: router, shared state and startup.

use crate::av::{FfmpegExecutor, TranscodeExecutor, Transcoder};
use crate::config::Config;
use crate::jobs::JobLayout;
use crate::workflow::Converter;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod assets;
pub mod listen;
mod routes;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub converter: Converter,
    pub assets: ServeDir,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(config: &Config, executor: Arc<dyn TranscodeExecutor>) -> Self {
        let layout = JobLayout::new(&config.upload_dir);
        let transcoder = Transcoder::new(executor, config.transcode_timeout);
        let converter = Converter::new(layout, transcoder, config.public_base_url.clone())
            .with_retention(config.upload_retention, config.keep_failed_jobs);

        Self {
            converter,
            assets: ServeDir::new(&config.upload_dir),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let body_limit = state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
        .try_into()
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(routes::root))
        .route("/uploads", get(routes::list_uploads))
        .route("/uploads/*path", get(assets::serve_upload))
        .route("/upload", post(routes::upload_media))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Only the configured origins, with credentials; preflight mirrors whatever
/// method and headers the browser asks for.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Prepare the upload directory, bind and serve until Ctrl+C.
pub async fn start(config: Config) -> Result<()> {
    let layout = JobLayout::new(&config.upload_dir);
    layout
        .ensure_dirs()
        .await
        .with_context(|| format!("Failed to create {:?}", layout.course_dir()))?;

    let executor = Arc::new(FfmpegExecutor::new(&config.ffmpeg_path));
    let state = AppState::new(&config, executor);
    let app = create_router(state, &config.allowed_origins);

    let listener = listen::bind_with_retry(&config.host, config.port, config.port_retries)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
