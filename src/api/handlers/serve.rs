use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::content_disposition;
use crate::api::response::ApiError;
use crate::AppState;

/// Serve a locally stored file by key.
/// Route: GET /api/files/serve/:key
pub async fn serve_local(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    // Only the local provider hands out serve links
    if !state.config.is_local_storage() {
        return Err(ApiError::not_found("File not found"));
    }

    let data = state.object_store.get(&key).await?;

    // Prefer the MIME type recorded at upload time
    let mime_type = match state.db.get_file_by_path(&key)? {
        Some(file) => file.mime_type,
        None => mime_guess::from_path(&key)
            .first_or_octet_stream()
            .to_string(),
    };

    let length = data.len() as u64;
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = content_disposition("inline", &key).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Stored names are never reused, so content under a key never changes
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000"),
    );

    Ok(response)
}
