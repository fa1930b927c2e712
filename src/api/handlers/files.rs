use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{clean_roles, content_disposition, file_to_response, FileResponse};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated, Pagination};
use crate::storage::models::{FileQuery, FileType, FileUpdate, SortField, SortOrder};
use crate::AppState;

const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateFileRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileType>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct FileUrlResponse {
    pub url: String,
}

impl UpdateFileRequest {
    fn into_update(self) -> Result<FileUpdate, ApiError> {
        let text = |name: &str, value: Option<String>| -> Result<Option<String>, ApiError> {
            match value {
                Some(v) if v.trim().is_empty() => {
                    Err(ApiError::bad_request(format!("{name} must not be empty")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
                None => Ok(None),
            }
        };

        let update = FileUpdate {
            title: text("title", self.title)?,
            description: text("description", self.description)?,
            category: text("category", self.category)?,
            language: text("language", self.language)?,
            provider: text("provider", self.provider)?,
            roles: self.roles.map(clean_roles).transpose()?,
        };

        if update.is_empty() {
            return Err(ApiError::bad_request(
                "at least one field (title, description, category, language, provider, roles) must be provided",
            ));
        }
        Ok(update)
    }
}

/// Blank filters are treated as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSendPaginated<FileResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    if params.limit > MAX_PAGE_SIZE {
        return Err(ApiError::bad_request(format!(
            "limit must not exceed {MAX_PAGE_SIZE}"
        )));
    }

    let query = FileQuery {
        search: non_blank(params.search),
        category: non_blank(params.category),
        language: non_blank(params.language),
        provider: non_blank(params.provider),
        role: non_blank(params.role),
        file_type: params.file_type,
        sort: params.sort,
        order: params.order,
        limit: params.limit,
        offset: params.offset,
    };

    let page = state.db.list_files(&query)?;
    let items = page.items.iter().map(file_to_response).collect();

    Ok(JSendPaginated::<FileResponse>::paginated(
        items,
        Pagination {
            limit: query.limit,
            offset: query.offset,
            total: page.total,
        },
    ))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let file = state
        .db
        .get_file(&id)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(JSend::success(file_to_response(&file)))
}

pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateFileRequest>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let update = req.into_update()?;

    let file = state
        .db
        .update_file(&id, &update)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    tracing::debug!(file_id = %id, "Updated file");
    Ok(JSend::success(file_to_response(&file)))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let file = state
        .db
        .get_file(&id)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    // Storage removal is best-effort; the record goes regardless
    if let Err(e) = state.object_store.delete(&file.file_path).await {
        tracing::warn!(file_id = %id, path = %file.file_path, error = %e, "Could not delete file from storage");
    }

    state.db.delete_file(&id)?;

    tracing::info!(file_id = %id, "Deleted file");
    Ok(JSend::success(()))
}

/// Stream the stored bytes back as an attachment named after the original upload.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let file = state
        .db
        .get_file(&id)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let data = state.object_store.get(&file.file_path).await?;
    let length = data.len() as u64;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        file.mime_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = content_disposition("attachment", &file.file_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// Provider link for a file, falling back to the download route.
pub async fn file_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileUrlResponse>>, ApiError> {
    let file = state
        .db
        .get_file(&id)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let url = match state.object_store.url(&file.file_path).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(file_id = %id, error = %e, "Provider URL unavailable, using download route");
            format!("/api/files/{}/download", file.id)
        }
    };

    Ok(JSend::success(FileUrlResponse { url }))
}
