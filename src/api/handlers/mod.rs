mod files;
mod serve;
mod system;
mod upload;

use serde::Serialize;

use crate::api::response::ApiError;
use crate::storage::models::{FileRecord, FileType};

pub use files::{delete_file, download_file, file_url, get_file, list_files, update_file};
pub use serve::serve_local;
pub use system::{health, storage_config};
pub use upload::{register_file, upload_file, upload_local, LOCAL_UPLOAD_LIMIT};

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub language: String,
    pub provider: String,
    pub roles: Vec<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_type: FileType,
    pub created_at: String,
    pub updated_at: String,
}

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        id: file.id.clone(),
        title: file.title.clone(),
        description: file.description.clone(),
        category: file.category.clone(),
        language: file.language.clone(),
        provider: file.provider.clone(),
        roles: file.roles.clone(),
        file_name: file.file_name.clone(),
        file_path: file.file_path.clone(),
        file_size: file.file_size,
        mime_type: file.mime_type.clone(),
        file_type: file.file_type,
        created_at: file.created_at.to_rfc3339(),
        updated_at: file.updated_at.to_rfc3339(),
    }
}

/// Validated catalog metadata shared by the upload and register paths.
#[derive(Debug, Clone, PartialEq)]
struct CatalogFields {
    title: String,
    description: String,
    category: String,
    language: String,
    provider: String,
    roles: Vec<String>,
}

impl CatalogFields {
    /// Trim every field; any blank field is "Missing required fields".
    fn new(
        title: Option<String>,
        description: Option<String>,
        category: Option<String>,
        language: Option<String>,
        provider: Option<String>,
        roles: Option<Vec<String>>,
    ) -> Result<Self, ApiError> {
        let required = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::bad_request("Missing required fields"))
        };

        let title = required(title)?;
        let description = required(description)?;
        let category = required(category)?;
        let language = required(language)?;
        let provider = required(provider)?;
        let roles = roles.ok_or_else(|| ApiError::bad_request("Missing required fields"))?;

        Ok(Self {
            title,
            description,
            category,
            language,
            provider,
            roles: clean_roles(roles)?,
        })
    }
}

/// Trim and de-duplicate roles; at least one must remain.
fn clean_roles(roles: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut cleaned: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        let role = role.trim();
        if !role.is_empty() && !cleaned.iter().any(|r| r == role) {
            cleaned.push(role.to_string());
        }
    }
    if cleaned.is_empty() {
        return Err(ApiError::bad_request("At least one role must be selected"));
    }
    Ok(cleaned)
}

/// Parse the `roles` form field, a JSON array of strings.
fn parse_roles(raw: &str) -> Result<Vec<String>, ApiError> {
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|_| ApiError::bad_request("Invalid roles format"))
}

/// MIME type from the declared content type, else guessed from the file name.
fn resolve_mime(content_type: Option<&str>, file_name: &str) -> String {
    content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(|ct| ct.to_string())
        .or_else(|| mime_guess::from_path(file_name).first().map(|m| m.to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// `Content-Disposition` value with a quoted, header-safe file name.
fn content_disposition(kind: &str, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("{kind}; filename=\"{safe}\"")
}
