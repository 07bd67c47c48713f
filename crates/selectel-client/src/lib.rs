//! # Selectel Storage Client
//!
//! A client for Swift-style object storage (Selectel Cloud Storage,
//! auth v1.0).
//!
//! ## Features
//!
//! - **Token lifecycle**: tokens are cached in memory and in a shared
//!   [`TokenStore`] (in-memory or Redis) for six hours
//! - **Transparent refresh**: a 401 triggers one re-authorization and one
//!   retried request
//! - **Streaming**: uploads and downloads go straight between disk and
//!   the network
//! - **Registry**: one memoized client per logical storage type
//!
//! ## Example
//!
//! ```rust,ignore
//! use selectel_client::{ClientRegistry, MemoryTokenStore, StorageSettings};
//! use std::{path::Path, sync::Arc};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = StorageSettings::load(Some(Path::new("selectel.toml")))?;
//!     let registry = ClientRegistry::new(settings, Arc::new(MemoryTokenStore::new()))?;
//!
//!     let client = registry.static_storage()?;
//!     client.upload_file(Path::new("hello.txt"), "docs/hello.txt").await?;
//!     for file in client.list_files().await? {
//!         println!("{}", client.public_url(&file));
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
pub mod http;
mod registry;
mod token_store;
mod types;
mod user;

pub use client::{StorageClient, AUTH_TOKEN_HEADER, SYMLINK_CONTENT_TYPE, SYMLINK_LOCATION_HEADER};
pub use config::{Config, ContainerSettings, StorageSettings, DEFAULT_AUTH_URL, DEFAULT_STORAGE_URL};
pub use error::{ClientError, Result};
pub use registry::{ClientRegistry, STORAGE_TYPE_STATIC, STORAGE_TYPE_VIDEO};
pub use token_store::{MemoryTokenStore, RedisTokenStore, TokenStore};
pub use types::*;
pub use user::{StorageUser, TOKEN_HEADER, TOKEN_KEY_PREFIX, TOKEN_TTL};

// Status codes are returned as-is by several operations
pub use reqwest::StatusCode;
