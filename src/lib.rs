//! file-catalog - A document and media catalog with swappable storage providers
//!
//! This crate provides file upload, metadata cataloging, and content serving with:
//! - A single storage interface over local disk, S3-compatible stores,
//!   Google Drive, and the UploadThing managed upload service
//! - redb embedded database for catalog metadata
//! - REST API with multipart upload, search, sorting and pagination
//! - CLI helpers for writing storage configuration and encoding database URLs

pub mod api;
pub mod cli;
pub mod config;
pub mod db_url;
pub mod naming;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
}
