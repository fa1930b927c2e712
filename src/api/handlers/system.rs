use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::config::StorageProvider;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StorageConfigResponse {
    pub provider: StorageProvider,
    pub is_local: bool,
}

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Which provider is active, so clients can pick an upload path.
pub async fn storage_config(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<StorageConfigResponse>> {
    JSend::success(StorageConfigResponse {
        provider: state.config.storage.provider,
        is_local: state.config.is_local_storage(),
    })
}
