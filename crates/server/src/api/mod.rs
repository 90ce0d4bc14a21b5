pub mod chat;
pub mod files;
pub mod health;
pub mod schemas;
pub mod workflows;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use harbor_core::RetentionParams;
use harbor_pipeline::Pipeline;
use harbor_staging::{ChunkAssembler, DownloadStore, UploadStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::ChatAdapter;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Chat action adapter over the same pipeline.
    pub chat: Arc<ChatAdapter>,
    /// Files waiting for a store action.
    pub uploads: Arc<UploadStore>,
    pub chunks: Arc<ChunkAssembler>,
    /// Single-use download tokens.
    pub downloads: Arc<dyn DownloadStore>,
    /// Retention applied when a workflow request names none.
    pub default_retention: RetentionParams,
    /// Request body limit for upload routes.
    pub max_upload_bytes: usize,
}

/// Build the Axum router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    // Multipart framing needs some room on top of the file itself.
    let body_limit = state.max_upload_bytes.saturating_add(64 * 1024);

    let uploads = Router::new()
        .route("/api/upload", post(files::upload))
        .route("/api/upload-chunk", post(files::upload_chunk))
        .route("/api/complete-upload", post(files::complete_upload))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .merge(uploads)
        .route("/api/delete", delete(files::delete_upload))
        .route("/api/download", get(files::download))
        .route("/v1/chat/{action}", post(chat::chat))
        .route("/v1/workflows/store", post(workflows::store))
        .route("/v1/workflows/retrieve", post(workflows::retrieve))
        .route("/v1/workflows/mint-store", post(workflows::mint_store))
        .route("/v1/workflows/mint-retrieve", post(workflows::mint_retrieve))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
