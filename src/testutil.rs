//! Shared test helpers for handler tests.

use std::sync::Arc;

use crate::config::{Config, ServerConfig, StorageConfig, StorageProvider};
use crate::object_store::{LocalStore, ObjectStore, UploadThingStore};
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let files_dir = temp_dir.path().join("files");
    let config = test_config(temp_dir, StorageProvider::Local);
    let object_store =
        LocalStore::new(&files_dir, &config.server.public_url).expect("Failed to create test object store");
    build_state(config, Arc::new(object_store))
}

/// Create a test AppState backed by the managed upload provider.
/// Nothing here reaches the network unless a handler fetches or deletes content.
pub fn uploadthing_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let mut config = test_config(temp_dir, StorageProvider::Uploadthing);
    config.storage.uploadthing_token = Some("test-token".to_string());
    let object_store = UploadThingStore::new("test-token").expect("Failed to create client");
    build_state(config, Arc::new(object_store))
}

fn test_config(temp_dir: &tempfile::TempDir, provider: StorageProvider) -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
            public_url: "http://localhost:3000".to_string(),
        },
        storage: StorageConfig {
            provider,
            upload_dir: temp_dir.path().join("files").to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        max_file_size: 1024 * 1024, // 1MB for tests
    }
}

fn build_state(config: Config, object_store: Arc<dyn ObjectStore>) -> Arc<AppState> {
    let db = Database::open(&config.server.data_dir).expect("Failed to open test database");
    Arc::new(AppState {
        config,
        db,
        object_store,
    })
}
