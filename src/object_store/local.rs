use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{ObjectStore, ObjectStoreError, StoredObject};
use crate::config::StorageProvider;

/// Local filesystem provider. Objects live directly under `base_path`.
pub struct LocalStore {
    base_path: PathBuf,
    public_url: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_url: &str) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key to a path inside the base directory.
    /// Keys must be a single plain path segment.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if !is_plain_key(key) {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

pub(crate) fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    async fn put(
        &self,
        name: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let path = self.object_path(name)?;
        tokio::fs::write(&path, &data).await?;
        Ok(StoredObject {
            path: name.to_string(),
            url: Some(self.url(name).await?),
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let full = self.object_path(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let full = self.object_path(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn url(&self, path: &str) -> Result<String, ObjectStoreError> {
        Ok(format!("{}/api/files/serve/{}", self.public_url, path))
    }
}
