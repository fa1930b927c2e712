mod google_drive;
mod local;
mod s3;
mod uploadthing;

pub use google_drive::GoogleDriveStore;
pub use local::LocalStore;
pub use s3::S3Store;
pub use uploadthing::{extract_file_key, UploadThingStore};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Where a stored object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Provider-specific handle used for later get/delete calls
    pub path: String,
    /// Public or provider-issued link, when the provider returns one
    pub url: Option<String>,
}

/// Abstraction over storage providers.
/// Paths are opaque to callers: a local key, an S3 key, or a Drive file id.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn provider(&self) -> StorageProvider;
    async fn put(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError>;
    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;
    async fn url(&self, path: &str) -> Result<String, ObjectStoreError>;
}

/// Construct the configured provider.
pub async fn build(
    config: &StorageConfig,
    public_url: &str,
) -> Result<Arc<dyn ObjectStore>, anyhow::Error> {
    let store: Arc<dyn ObjectStore> = match config.provider {
        StorageProvider::Local => Arc::new(LocalStore::new(&config.upload_dir, public_url)?),
        StorageProvider::AwsS3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Missing required AWS S3 configuration"))?;
            Arc::new(S3Store::new(s3))
        }
        StorageProvider::GoogleDrive => {
            let drive = config
                .google_drive
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Missing required Google Drive configuration"))?;
            Arc::new(GoogleDriveStore::new(drive)?)
        }
        StorageProvider::Uploadthing => {
            let token = config
                .uploadthing_token
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("UPLOADTHING_TOKEN is required"))?;
            Arc::new(UploadThingStore::new(token)?)
        }
    };
    Ok(store)
}
