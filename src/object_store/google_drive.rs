use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{ObjectStore, ObjectStoreError, StoredObject};
use crate::config::{DriveCredentials, GoogleDriveConfig, StorageProvider};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Refresh tokens this long before Google says they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Google Drive backend. Paths are Drive file ids.
pub struct GoogleDriveStore {
    client: Client,
    credentials: DriveCredentials,
    folder_id: Option<String>,
    access_token: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_content_link: Option<String>,
}

impl GoogleDriveStore {
    pub fn new(config: &GoogleDriveConfig) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            folder_id: config.folder_id.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Current access token, refreshing it when missing or close to expiry.
    async fn token(&self) -> Result<String, ObjectStoreError> {
        {
            let cached = self.access_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| is_fresh(t)) {
                return Ok(token.value.clone());
            }
        }

        let mut lock = self.access_token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = lock.as_ref().filter(|t| is_fresh(t)) {
            return Ok(token.value.clone());
        }

        let response = self
            .fetch_token()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("Drive authentication failed: {e}")))?;
        let expires_in = Duration::from_secs(response.expires_in.unwrap_or(3600));
        let value = response.access_token;
        *lock = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + expires_in,
        });
        tracing::debug!(expires_in_secs = expires_in.as_secs(), "Refreshed Drive access token");
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<TokenResponse, anyhow::Error> {
        match self.credentials {
            DriveCredentials::OAuth {
                ref client_id,
                ref client_secret,
                ref refresh_token,
                ..
            } => {
                let resp = self
                    .client
                    .post(TOKEN_URI)
                    .form(&[
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("refresh_token", refresh_token.as_str()),
                        ("grant_type", "refresh_token"),
                    ])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(resp)
            }
            DriveCredentials::ServiceAccount { ref key_file } => {
                self.token_from_service_account(key_file).await
            }
        }
    }

    async fn token_from_service_account(&self, path: &str) -> Result<TokenResponse, anyhow::Error> {
        let key_json = tokio::fs::read_to_string(path).await?;
        let key: ServiceAccountKey = serde_json::from_str(&key_json)?;
        let token_uri = key.token_uri.as_deref().unwrap_or(TOKEN_URI);

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": DRIVE_SCOPE,
            "aud": token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");

        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{FILES_URL}/{id}")
    }
}

fn is_fresh(token: &CachedToken) -> bool {
    token.expires_at > Instant::now() + REFRESH_MARGIN
}

#[async_trait]
impl ObjectStore for GoogleDriveStore {
    fn provider(&self) -> StorageProvider {
        StorageProvider::GoogleDrive
    }

    async fn put(
        &self,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let token = self.token().await?;

        let metadata = file_metadata(name, self.folder_id.as_deref());
        let boundary = format!("file-catalog-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, &metadata, content_type, &data);

        let resp = self
            .client
            .post(UPLOAD_URL)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id,webViewLink,webContentLink"),
            ])
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "Drive upload failed ({status}): {body}"
            )));
        }

        let file: DriveFile = resp
            .json()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        tracing::debug!(drive_id = %file.id, name = %name, "Stored object in Google Drive");

        Ok(StoredObject {
            path: file.id,
            url: file.web_content_link,
        })
    }

    async fn get(&self, path: &str) -> Result<Bytes, ObjectStoreError> {
        let token = self.token().await?;

        let resp = self
            .client
            .get(self.file_url(path))
            .query(&[("alt", "media")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "Drive download failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let token = self.token().await?;

        let resp = self
            .client
            .delete(self.file_url(path))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // 404 is fine -- file already gone
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "Drive delete failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, ObjectStoreError> {
        let token = self.token().await?;

        let resp = self
            .client
            .get(self.file_url(path))
            .query(&[("fields", "id,webContentLink")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(path.to_string()));
        }

        let file: DriveFile = resp
            .error_for_status()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?
            .json()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        file.web_content_link
            .ok_or_else(|| ObjectStoreError::Backend(format!("Drive file {path} has no content link")))
    }
}

fn file_metadata(name: &str, folder_id: Option<&str>) -> serde_json::Value {
    match folder_id {
        Some(folder) => serde_json::json!({ "name": name, "parents": [folder] }),
        None => serde_json::json!({ "name": name }),
    }
}

/// Body for a Drive `uploadType=multipart` request: JSON metadata part, then the media part.
fn multipart_related_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    data: &[u8],
) -> Bytes {
    let mut body = BytesMut::with_capacity(data.len() + 512);
    body.put_slice(format!("--{boundary}\r\n").as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(metadata.to_string().as_bytes());
    body.put_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.put_slice(data);
    body.put_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body.freeze()
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // Strip PEM armor and decode the PKCS#8 DER
    let der_b64: String = private_key_pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}
