//! Client configuration

use crate::{Credentials, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default authorization host
pub const DEFAULT_AUTH_URL: &str = "https://auth.selcdn.ru";

/// Default storage API host
pub const DEFAULT_STORAGE_URL: &str = "https://api.selcdn.ru";

/// Environment prefix for [`StorageSettings::load`]
pub const ENV_PREFIX: &str = "SELECTEL";

/// Transport configuration shared by every client
#[derive(Clone, Debug)]
pub struct Config {
    /// Authorization endpoint base URL
    pub auth_url: String,
    /// Storage endpoint base URL
    pub storage_url: String,
    /// Request timeout, `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// User agent string
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            timeout: None,
            user_agent: format!("selectel-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Create a new config with the given storage endpoint
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            ..Default::default()
        }
    }

    /// Set the authorization endpoint
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full URL of the authorization request
    pub fn auth_endpoint(&self) -> String {
        format!("{}/auth/v1.0", self.auth_url.trim_end_matches('/'))
    }

    /// Base URL for storage requests
    pub fn base_url(&self) -> &str {
        self.storage_url.trim_end_matches('/')
    }
}

/// Connection settings of one logical storage type
#[derive(Clone, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Container name
    pub container: String,
    /// Host used to build public links
    pub public_host: String,
    /// Storage user login
    pub login: String,
    /// Storage user password
    pub password: String,
}

impl ContainerSettings {
    /// Credentials of the container's user
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.login.clone(), self.password.clone())
    }
}

impl fmt::Debug for ContainerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerSettings")
            .field("container", &self.container)
            .field("public_host", &self.public_host)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Full settings: transport plus per-type container credentials
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Storage type name -> container settings
    #[serde(default)]
    pub storages: HashMap<String, ContainerSettings>,
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_storage_url() -> String {
    DEFAULT_STORAGE_URL.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            storage_url: default_storage_url(),
            timeout_secs: None,
            storages: HashMap::new(),
        }
    }
}

impl StorageSettings {
    /// Load settings from an optional TOML file, overridden by
    /// `SELECTEL__*` environment variables
    /// (e.g. `SELECTEL__STORAGES__STATIC__LOGIN`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Register a storage type
    pub fn with_storage(mut self, storage_type: impl Into<String>, settings: ContainerSettings) -> Self {
        self.storages.insert(storage_type.into(), settings);
        self
    }

    /// Transport configuration derived from these settings
    pub fn client_config(&self) -> Config {
        let mut config = Config::new(self.storage_url.clone()).with_auth_url(self.auth_url.clone());
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_endpoints() {
        let config = Config::new("https://api.example.com/").with_auth_url("https://auth.example.com/");
        assert_eq!(config.base_url(), "https://api.example.com");
        assert_eq!(config.auth_endpoint(), "https://auth.example.com/auth/v1.0");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_container_settings_debug_hides_password() {
        let settings = ContainerSettings {
            container: "static".to_string(),
            public_host: "cdn.example.com".to_string(),
            login: "user".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", settings);
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
storage_url = "https://api.example.com"
timeout_secs = 15

[storages.static]
container = "container_1"
public_host = "static.example.com"
login = "static-user"
password = "secret"
"#
        )
        .unwrap();

        let settings = StorageSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(settings.storage_url, "https://api.example.com");
        assert_eq!(settings.storages["static"].container, "container_1");

        let config = settings.client_config();
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
    }
}
