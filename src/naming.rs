//! Storage names for uploaded files.
//!
//! Stored names never reuse the client's file name; only a sanitized
//! extension is carried over.

use chrono::{DateTime, Utc};
use rand::Rng;

const MAX_EXTENSION_LEN: usize = 16;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Extension of the last path segment including the dot, lower-cased.
/// Returns an empty string for names without a usable extension.
pub fn extension(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let Some((stem, ext)) = base.rsplit_once('.') else {
        return String::new();
    };
    // Dotfiles like ".env" have no extension
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", ext.to_ascii_lowercase())
}

/// `<uuid><ext>`, used for catalog uploads.
pub fn catalog_file_name(original: &str) -> String {
    format!("{}{}", uuid::Uuid::new_v4(), extension(original))
}

/// `<unix millis>-<6 random chars><ext>`, used for raw local uploads.
pub fn timestamped_key(original: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}{}", now.timestamp_millis(), suffix, extension(original))
}
