use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::db_url::{self, DbUrlError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
    #[error("Unsupported storage provider: {0}")]
    UnsupportedProvider(String),
    #[error(transparent)]
    DatabaseUrl(#[from] DbUrlError),
}

/// Default catalog upload limit (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Maximum catalog upload size in bytes
    pub max_file_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the metadata database
    pub data_dir: String,
    /// Externally visible base URL, used for local file links
    pub public_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    Local,
    AwsS3,
    GoogleDrive,
    Uploadthing,
}

impl StorageProvider {
    /// Parse a provider name. Accepts both `AWS_S3` and `aws-s3` spellings.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "local" => Ok(StorageProvider::Local),
            "aws_s3" | "s3" => Ok(StorageProvider::AwsS3),
            "google_drive" | "drive" => Ok(StorageProvider::GoogleDrive),
            "uploadthing" => Ok(StorageProvider::Uploadthing),
            _ => Err(ConfigError::UnsupportedProvider(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Local => "local",
            StorageProvider::AwsS3 => "aws_s3",
            StorageProvider::GoogleDrive => "google_drive",
            StorageProvider::Uploadthing => "uploadthing",
        }
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...)
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DriveCredentials {
    OAuth {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        redirect_uri: Option<String>,
    },
    /// Path to a service account JSON key
    ServiceAccount { key_file: String },
}

#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    pub credentials: DriveCredentials,
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Directory for the local provider
    pub upload_dir: String,
    pub s3: Option<S3Config>,
    pub google_drive: Option<GoogleDriveConfig>,
    pub uploadthing_token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            upload_dir: "uploads".to_string(),
            s3: None,
            google_drive: None,
            uploadthing_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| unquote(&v).to_string())
                .filter(|v| !v.trim().is_empty())
        };

        let bind_address = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let public_url = var("PUBLIC_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        let data_dir = match db_url::resolve(&var)? {
            Some(url) => db_url::data_dir_from_url(&url),
            None => var("DATA_DIR").unwrap_or_else(|| "./data".to_string()),
        };

        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MAX_FILE_SIZE must be a positive integer, got '{raw}'"
                ))
            })?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let provider = match var("STORAGE_PROVIDER") {
            Some(raw) => StorageProvider::parse(&raw)?,
            None => StorageProvider::Local,
        };

        let upload_dir = var("UPLOAD_DIR")
            .or_else(|| var("UPLOADS_DIR"))
            .unwrap_or_else(|| "uploads".to_string());

        let s3 = match (
            var("AWS_REGION"),
            var("AWS_ACCESS_KEY_ID"),
            var("AWS_SECRET_ACCESS_KEY"),
            var("AWS_S3_BUCKET"),
        ) {
            (Some(region), Some(access_key_id), Some(secret_access_key), Some(bucket)) => {
                Some(S3Config {
                    region,
                    access_key_id,
                    secret_access_key,
                    bucket,
                    endpoint: var("AWS_S3_ENDPOINT"),
                })
            }
            _ => None,
        };

        let drive_credentials = if let Some(key_file) = var("GOOGLE_DRIVE_SERVICE_ACCOUNT_KEY") {
            Some(DriveCredentials::ServiceAccount { key_file })
        } else {
            match (
                var("GOOGLE_DRIVE_CLIENT_ID"),
                var("GOOGLE_DRIVE_CLIENT_SECRET"),
                var("GOOGLE_DRIVE_REFRESH_TOKEN"),
            ) {
                (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                    Some(DriveCredentials::OAuth {
                        client_id,
                        client_secret,
                        refresh_token,
                        redirect_uri: var("GOOGLE_DRIVE_REDIRECT_URI"),
                    })
                }
                _ => None,
            }
        };
        let google_drive = drive_credentials.map(|credentials| GoogleDriveConfig {
            credentials,
            folder_id: var("GOOGLE_DRIVE_FOLDER_ID"),
        });

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
                public_url,
            },
            storage: StorageConfig {
                provider,
                upload_dir,
                s3,
                google_drive,
                uploadthing_token: var("UPLOADTHING_TOKEN"),
            },
            max_file_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILE_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.server.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database location cannot be empty".to_string(),
            ));
        }

        match self.storage.provider {
            StorageProvider::Local => {}
            StorageProvider::AwsS3 if self.storage.s3.is_none() => {
                return Err(ConfigError::ValidationError(
                    "Missing required AWS S3 configuration".to_string(),
                ));
            }
            StorageProvider::GoogleDrive if self.storage.google_drive.is_none() => {
                return Err(ConfigError::ValidationError(
                    "Missing required Google Drive configuration".to_string(),
                ));
            }
            StorageProvider::Uploadthing if self.storage.uploadthing_token.is_none() => {
                return Err(ConfigError::ValidationError(
                    "UPLOADTHING_TOKEN is required when STORAGE_PROVIDER=uploadthing".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    pub fn is_local_storage(&self) -> bool {
        self.storage.provider == StorageProvider::Local
    }
}

/// Strip one pair of matching surrounding quotes, as left by env files
/// passed through verbatim.
fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
