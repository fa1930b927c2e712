use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{file_to_response, parse_roles, resolve_mime, CatalogFields, FileResponse};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::config::StorageProvider;
use crate::naming;
use crate::object_store::extract_file_key;
use crate::storage::models::{FileRecord, FileType};
use crate::AppState;

/// Size cap for the raw local upload endpoint (64 MiB)
pub const LOCAL_UPLOAD_LIMIT: u64 = 64 * 1024 * 1024;

/// MIME types accepted by the raw local upload endpoint, besides image/video/audio.
const ALLOWED_LOCAL_TYPES: &[&str] = &[
    "application/pdf",
    "application/zip",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "text/plain",
    "text/csv",
];

/// Form fields every catalog upload must carry
const CATALOG_FIELDS: &[&str] = &[
    "title",
    "description",
    "category",
    "language",
    "provider",
    "roles",
];

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub url: String,
    pub key: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterFileRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub provider: Option<String>,
    pub roles: Option<Vec<String>>,
    pub file_name: String,
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// The `file` part of a multipart upload
struct FilePart {
    name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Everything read from a multipart form
#[derive(Default)]
struct UploadForm {
    file: Option<FilePart>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read all parts. Files larger than `max_size` are rejected once read.
    async fn read(multipart: &mut Multipart, max_size: u64) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_size, "Invalid multipart data"))?
        {
            let field_name = field.name().unwrap_or("").to_string();

            if field_name == "file" {
                let name = field.file_name().unwrap_or("").trim().to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_size, "Failed to read file"))?;

                if data.len() as u64 > max_size {
                    return Err(too_large(max_size));
                }

                form.file = Some(FilePart {
                    name,
                    content_type,
                    data,
                });
            } else if !field_name.is_empty() {
                let text = field.text().await.map_err(|e| {
                    multipart_error(e, max_size, &format!("Invalid {field_name}"))
                })?;
                form.fields.insert(field_name, text);
            }
        }

        Ok(form)
    }

    fn take_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    fn is_blank(&self, name: &str) -> bool {
        self.fields.get(name).map_or(true, |v| v.trim().is_empty())
    }
}

fn too_large(max_size: u64) -> ApiError {
    ApiError::payload_too_large(format!("File too large. Maximum size is {max_size} bytes"))
}

/// A body cut off by the route's size limit is still an oversized file.
fn multipart_error(e: MultipartError, max_size: u64, context: &str) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return too_large(max_size);
    }
    ApiError::bad_request(format!("{context}: {e}"))
}

fn is_allowed_local_type(mime_type: &str) -> bool {
    ALLOWED_LOCAL_TYPES.contains(&mime_type)
        || mime_type.starts_with("image/")
        || mime_type.starts_with("video/")
        || mime_type.starts_with("audio/")
}

// ============================================================================
// Handlers
// ============================================================================

/// Catalog upload: store the file with the configured provider, then record its metadata.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let mut form = UploadForm::read(&mut multipart, state.config.max_file_size).await?;

    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if CATALOG_FIELDS.iter().any(|name| form.is_blank(name)) {
        return Err(ApiError::bad_request("Missing required fields"));
    }
    let roles = match form.take_field("roles") {
        Some(raw) => Some(parse_roles(&raw)?),
        None => None,
    };
    let fields = CatalogFields::new(
        form.take_field("title"),
        form.take_field("description"),
        form.take_field("category"),
        form.take_field("language"),
        form.take_field("provider"),
        roles,
    )?;

    let file_name = if file.name.is_empty() {
        "upload".to_string()
    } else {
        file.name
    };
    let mime_type = resolve_mime(file.content_type.as_deref(), &file_name);
    let file_size = file.data.len() as u64;
    let stored_name = naming::catalog_file_name(&file_name);

    // Phase 1: bytes to the storage provider
    let stored = state
        .object_store
        .put(&stored_name, file.data, &mime_type)
        .await?;

    // Phase 2: metadata record
    let now = Utc::now();
    let record = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        file_name,
        file_path: stored.path,
        file_size,
        file_type: FileType::from_mime(&mime_type),
        mime_type,
        created_at: now,
        updated_at: now,
        title: fields.title,
        description: fields.description,
        category: fields.category,
        language: fields.language,
        provider: fields.provider,
        roles: fields.roles,
    };

    if let Err(e) = state.db.put_file(&record) {
        // Best-effort cleanup of the uploaded blob
        if let Err(cleanup) = state.object_store.delete(&record.file_path).await {
            tracing::warn!(path = %record.file_path, error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e.into());
    }

    tracing::info!(
        file_id = %record.id,
        path = %record.file_path,
        size = record.file_size,
        provider = %state.object_store.provider(),
        "Uploaded file"
    );

    Ok(JSend::success(file_to_response(&record)))
}

/// Raw upload to local storage, without a catalog record.
pub async fn upload_local(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<UploadResult>>, ApiError> {
    if !state.config.is_local_storage() {
        return Err(ApiError::bad_request(
            "Local upload endpoint called but storage provider is not local",
        ));
    }

    let form = UploadForm::read(&mut multipart, LOCAL_UPLOAD_LIMIT).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let mime_type = resolve_mime(file.content_type.as_deref(), &file.name);
    if !is_allowed_local_type(&mime_type) {
        return Err(ApiError::bad_request("File type not allowed"));
    }

    let key = naming::timestamped_key(&file.name, Utc::now());
    let size = file.data.len() as u64;
    let stored = state.object_store.put(&key, file.data, &mime_type).await?;
    let url = match stored.url {
        Some(url) => url,
        None => state.object_store.url(&stored.path).await?,
    };

    tracing::info!(key = %stored.path, size, "Stored local upload");

    Ok(JSend::success(UploadResult {
        url,
        key: stored.path,
        name: file.name,
        size,
    }))
}

/// Record a file that the client already uploaded to the managed upload service.
pub async fn register_file(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterFileRequest>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    if state.config.storage.provider != StorageProvider::Uploadthing {
        return Err(ApiError::bad_request(
            "File registration is only available with the uploadthing provider",
        ));
    }

    let fields = CatalogFields::new(
        req.title,
        req.description,
        req.category,
        req.language,
        req.provider,
        req.roles,
    )?;

    let key = req
        .file_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .or_else(|| req.file_url.as_deref().and_then(extract_file_key))
        .ok_or_else(|| ApiError::bad_request("file_key or file_url is required"))?;

    let file_name = req.file_name.trim().to_string();
    if file_name.is_empty() {
        return Err(ApiError::bad_request("file_name must not be empty"));
    }

    if state.db.path_exists(&key)? {
        return Err(ApiError::conflict(format!("file '{key}' is already registered")));
    }

    let mime_type = resolve_mime(req.mime_type.as_deref(), &file_name);
    let now = Utc::now();
    let record = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        file_name,
        file_path: key,
        file_size: req.file_size,
        file_type: FileType::from_mime(&mime_type),
        mime_type,
        created_at: now,
        updated_at: now,
        title: fields.title,
        description: fields.description,
        category: fields.category,
        language: fields.language,
        provider: fields.provider,
        roles: fields.roles,
    };
    state.db.put_file(&record)?;

    tracing::info!(file_id = %record.id, key = %record.file_path, "Registered managed upload");

    Ok(JSend::success(file_to_response(&record)))
}
