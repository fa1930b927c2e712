//! Base64 codec for database connection strings.
//!
//! Some deployment platforms mangle connection strings containing special
//! characters, so the location can be supplied as `DATABASE_URL_BASE64`.

use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbUrlError {
    #[error("Invalid base64 encoded database URL: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Decoded database URL is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub fn encode(url: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(url.as_bytes())
}

pub fn decode(encoded: &str) -> Result<String, DbUrlError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// Resolve the database location: `DATABASE_URL_BASE64` wins over `DATABASE_URL`.
pub fn resolve<F>(lookup: F) -> Result<Option<String>, DbUrlError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(encoded) = lookup("DATABASE_URL_BASE64") {
        return decode(&encoded).map(Some);
    }
    Ok(lookup("DATABASE_URL"))
}

/// Strip a `redb://` or `file://` scheme, leaving a directory path.
pub fn data_dir_from_url(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix("redb://")
        .or_else(|| url.strip_prefix("file://"))
        .unwrap_or(url)
        .to_string()
}
