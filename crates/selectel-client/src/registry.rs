//! Registry of per-storage-type clients

use crate::{
    http::HttpExecutor, ClientError, Config, Result, StorageClient, StorageSettings, StorageUser,
    TokenStore,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Storage type for static content
pub const STORAGE_TYPE_STATIC: &str = "static";

/// Storage type for video content
pub const STORAGE_TYPE_VIDEO: &str = "video";

/// Builds one [`StorageClient`] per storage type on first use and hands
/// out the same instance afterwards.
pub struct ClientRegistry {
    settings: StorageSettings,
    config: Config,
    http: Arc<HttpExecutor>,
    store: Arc<dyn TokenStore>,
    clients: DashMap<String, Arc<StorageClient>>,
}

impl ClientRegistry {
    pub fn new(settings: StorageSettings, store: Arc<dyn TokenStore>) -> Result<Self> {
        let config = settings.client_config();
        let http = Arc::new(HttpExecutor::new(&config)?);
        Ok(Self {
            settings,
            config,
            http,
            store,
            clients: DashMap::new(),
        })
    }

    /// Client for `storage_type`
    pub fn get(&self, storage_type: &str) -> Result<Arc<StorageClient>> {
        if let Some(client) = self.clients.get(storage_type) {
            return Ok(client.clone());
        }

        let container = self
            .settings
            .storages
            .get(storage_type)
            .ok_or_else(|| ClientError::UnknownStorageType(storage_type.to_string()))?;
        if container.container.trim_matches('/').is_empty() {
            return Err(ClientError::Config(format!(
                "storage type '{}' has an empty container name",
                storage_type
            )));
        }

        // The entry lock makes the first caller win
        let client = self
            .clients
            .entry(storage_type.to_string())
            .or_insert_with(|| {
                debug!("Creating storage client for '{}'", storage_type);
                let user = StorageUser::new(
                    container.credentials(),
                    &self.config,
                    self.http.clone(),
                    self.store.clone(),
                );
                Arc::new(StorageClient::new(
                    &self.config,
                    self.http.clone(),
                    user,
                    &container.container,
                    &container.public_host,
                ))
            })
            .clone();
        Ok(client)
    }

    /// Client for static content
    pub fn static_storage(&self) -> Result<Arc<StorageClient>> {
        self.get(STORAGE_TYPE_STATIC)
    }

    /// Client for video content
    pub fn video_storage(&self) -> Result<Arc<StorageClient>> {
        self.get(STORAGE_TYPE_VIDEO)
    }

    /// Registered storage types
    pub fn storage_types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.settings.storages.keys().cloned().collect();
        types.sort();
        types
    }
}
