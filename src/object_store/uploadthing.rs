use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use super::{ObjectStore, ObjectStoreError, StoredObject};
use crate::config::StorageProvider;

const API_URL: &str = "https://api.uploadthing.com";
const CDN_URL: &str = "https://utfs.io/f";

/// UploadThing managed upload service.
///
/// Browsers upload directly to UploadThing; the server only records the
/// resulting file key, serves links to it, and deletes it.
pub struct UploadThingStore {
    client: Client,
    token: String,
}

impl UploadThingStore {
    pub fn new(token: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            token: token.to_string(),
        })
    }

    fn cdn_url(key: &str) -> String {
        format!("{CDN_URL}/{key}")
    }
}

/// File key from an UploadThing URL (`https://utfs.io/f/<key>`), a local serve
/// URL, or a bare key.
pub fn extract_file_key(url_or_key: &str) -> Option<String> {
    let without_query = url_or_key
        .split(['?', '#'])
        .next()
        .unwrap_or(url_or_key);
    without_query
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
}

#[async_trait]
impl ObjectStore for UploadThingStore {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Uploadthing
    }

    async fn put(
        &self,
        _name: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        Err(ObjectStoreError::Unsupported(
            "UploadThing uploads are performed by the client".to_string(),
        ))
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let resp = self
            .client
            .get(Self::cdn_url(path))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(ObjectStoreError::Backend(format!(
                "UploadThing download failed ({status})"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let resp = self
            .client
            .post(format!("{API_URL}/api/deleteFile"))
            .header("X-Uploadthing-Api-Key", &self.token)
            .json(&serde_json::json!({ "fileKey": path }))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "UploadThing delete failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, ObjectStoreError> {
        Ok(Self::cdn_url(path))
    }
}
