use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a file derived from its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Archive,
    Audio,
    Binary,
    Document,
    Image,
    Video,
}

impl FileType {
    /// Derive a file type classification from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.split(';').next().unwrap_or("").trim();
        let (primary, sub) = mime_type.split_once('/').unwrap_or((mime_type, ""));
        match primary {
            "audio" => FileType::Audio,
            "image" => FileType::Image,
            "video" => FileType::Video,
            "text" => FileType::Document,
            "application" => match sub {
                "pdf"
                | "msword"
                | "rtf"
                | "vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                | "vnd.openxmlformats-officedocument.presentationml.presentation"
                | "vnd.ms-excel"
                | "vnd.ms-powerpoint" => FileType::Document,
                "zip" | "x-zip-compressed" | "gzip" | "x-tar" | "x-7z-compressed" => {
                    FileType::Archive
                }
                _ => FileType::Binary,
            },
            _ => FileType::Binary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Archive => "archive",
            FileType::Audio => "audio",
            FileType::Binary => "binary",
            FileType::Document => "document",
            FileType::Image => "image",
            FileType::Video => "video",
        }
    }
}

/// A catalog entry stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    // System fields
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Catalog fields
    pub title: String,
    pub description: String,
    pub category: String,
    pub language: String,
    pub provider: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial update of catalog fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub provider: Option<String>,
    pub roles: Option<Vec<String>>,
}

impl FileUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.language.is_none()
            && self.provider.is_none()
            && self.roles.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    FileName,
    FileSize,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Listing parameters: search, filters, ordering and a page window.
#[derive(Debug, Clone, PartialEq)]
pub struct FileQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub provider: Option<String>,
    pub role: Option<String>,
    pub file_type: Option<FileType>,
    pub sort: SortField,
    pub order: SortOrder,
    pub limit: u32,
    pub offset: u32,
}

impl Default for FileQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            language: None,
            provider: None,
            role: None,
            file_type: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: 20,
            offset: 0,
        }
    }
}

impl FileQuery {
    /// Whether a record passes the search term and every filter.
    pub fn matches(&self, file: &FileRecord) -> bool {
        if let Some(ref term) = self.search {
            let term = term.trim().to_lowercase();
            if !term.is_empty()
                && !file.title.to_lowercase().contains(&term)
                && !file.description.to_lowercase().contains(&term)
                && !file.file_name.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if !file.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref language) = self.language {
            if !file.language.eq_ignore_ascii_case(language) {
                return false;
            }
        }
        if let Some(ref provider) = self.provider {
            if !file.provider.eq_ignore_ascii_case(provider) {
                return false;
            }
        }
        if let Some(ref role) = self.role {
            if !file.roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
                return false;
            }
        }
        if let Some(file_type) = self.file_type {
            if file.file_type != file_type {
                return false;
            }
        }
        true
    }
}

/// One page of listing results
#[derive(Debug, Clone)]
pub struct FilePage {
    pub items: Vec<FileRecord>,
    /// Number of records matching the query, ignoring the page window
    pub total: u64,
}
