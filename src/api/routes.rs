use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Allowance for multipart boundaries and text fields on top of the file itself
pub(super) const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_file_size as usize + MULTIPART_OVERHEAD;
    let local_upload_limit = handlers::LOCAL_UPLOAD_LIMIT as usize + MULTIPART_OVERHEAD;

    Router::new()
        // Uploads
        .route(
            "/api/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/upload/local",
            post(handlers::upload_local).layer(DefaultBodyLimit::max(local_upload_limit)),
        )
        // Catalog
        .route("/api/files", get(handlers::list_files))
        .route("/api/files/register", post(handlers::register_file))
        .route(
            "/api/files/:id",
            get(handlers::get_file)
                .put(handlers::update_file)
                .delete(handlers::delete_file),
        )
        .route("/api/files/:id/download", get(handlers::download_file))
        .route("/api/files/:id/url", get(handlers::file_url))
        // Local content
        .route("/api/files/serve/:key", get(handlers::serve_local))
        // Config and health
        .route("/api/config/storage", get(handlers::storage_config))
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
