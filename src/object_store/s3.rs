use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{config::Credentials, presigning::PresigningConfig, primitives::ByteStream, Client};
use bytes::Bytes;

use super::{ObjectStore, ObjectStoreError, StoredObject};
use crate::config::{S3Config, StorageProvider};

/// Lifetime of presigned download links
const PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// S3 (or S3-compatible) object store backend.
pub struct S3Store {
    bucket: String,
    client: Client,
    endpoint: Option<String>,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "file-catalog",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .behavior_version(BehaviorVersion::latest());

        // S3-compatible stores generally need path-style addressing
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            bucket: config.bucket.clone(),
            client: Client::from_conf(builder.build()),
            endpoint: config.endpoint.clone(),
        }
    }

    fn public_url(&self, key: &str) -> String {
        match self.endpoint {
            Some(ref endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn provider(&self) -> StorageProvider {
        StorageProvider::AwsS3
    }

    async fn put(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("S3 upload failed: {e}")))?;

        tracing::debug!(bucket = %self.bucket, key = %name, "Stored object in S3");

        Ok(StoredObject {
            path: name.to_string(),
            url: Some(self.public_url(name)),
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Err(ObjectStoreError::NotFound(path.to_string()));
                }
                return Err(ObjectStoreError::Backend(format!(
                    "S3 download failed: {service_err}"
                )));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("S3 body read failed: {e}")))?;

        Ok(data.into_bytes())
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("S3 delete failed: {e}")))?;
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, ObjectStoreError> {
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL)
            .map_err(|e| ObjectStoreError::Backend(format!("Invalid presigning config: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("S3 presign failed: {e}")))?;

        Ok(request.uri().to_string())
    }
}
