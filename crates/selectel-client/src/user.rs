//! Storage user: credentials plus token lifecycle

use crate::{
    http::{HttpExecutor, HttpRequest},
    AuthToken, ClientError, Config, Credentials, Result, TokenStore,
};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Response header carrying the issued token
pub const TOKEN_HEADER: &str = "X-Storage-Token";

/// Lifetime of a cached token (6 hours)
pub const TOKEN_TTL: Duration = Duration::from_secs(21600);

/// Prefix of the token store key, followed by the login
pub const TOKEN_KEY_PREFIX: &str = "selectel_storage_token_";

/// A user accessing a container. Obtains a token lazily and keeps it in
/// memory and in the shared [`TokenStore`].
pub struct StorageUser {
    credentials: Credentials,
    auth_endpoint: String,
    http: Arc<HttpExecutor>,
    store: Arc<dyn TokenStore>,
    token: Mutex<Option<AuthToken>>,
}

impl StorageUser {
    pub fn new(
        credentials: Credentials,
        config: &Config,
        http: Arc<HttpExecutor>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            credentials,
            auth_endpoint: config.auth_endpoint(),
            http,
            store,
            token: Mutex::new(None),
        }
    }

    pub fn login(&self) -> &str {
        self.credentials.login()
    }

    /// Return the current token, consulting memory, then the store, then
    /// the authorization endpoint.
    #[instrument(skip(self), fields(login = %self.login()))]
    pub async fn token(&self) -> Result<AuthToken> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let key = self.store_key();
        let cached = match self.store.get(&key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Token store read failed, authorizing instead: {}", e);
                None
            }
        };

        let token = match cached {
            Some(value) => AuthToken::new(value),
            None => {
                let token = self.authorize().await?;
                self.persist(&key, &token).await;
                token
            }
        };

        *slot = Some(token.clone());
        Ok(token)
    }

    /// Replace a token the storage answered 401 to.
    ///
    /// When another caller already swapped `rejected` for a new token,
    /// that token is returned as is. Otherwise the rejected token is
    /// evicted from both tiers and a new one is authorized.
    #[instrument(skip(self, rejected), fields(login = %self.login()))]
    pub async fn refresh_token(&self, rejected: &AuthToken) -> Result<AuthToken> {
        let mut slot = self.token.lock().await;
        if let Some(current) = slot.as_ref().filter(|t| *t != rejected) {
            debug!("Token already refreshed");
            return Ok(current.clone());
        }

        let key = self.store_key();
        *slot = None;
        if let Err(e) = self.store.remove(&key).await {
            warn!("Failed to evict rejected token: {}", e);
        }

        let token = self.authorize().await?;
        self.persist(&key, &token).await;
        *slot = Some(token.clone());
        Ok(token)
    }

    fn store_key(&self) -> String {
        format!("{}{}", TOKEN_KEY_PREFIX, self.login())
    }

    async fn persist(&self, key: &str, token: &AuthToken) {
        if let Err(e) = self.store.set(key, token.as_str(), TOKEN_TTL).await {
            warn!("Failed to cache token: {}", e);
        }
    }

    async fn authorize(&self) -> Result<AuthToken> {
        let request = HttpRequest::new(Method::GET, self.auth_endpoint.clone())
            .header("X-Auth-User", self.credentials.login())
            .header("X-Auth-Key", self.credentials.password());
        let response = self.http.execute(&request).await?;

        if !response.is_success() {
            return Err(ClientError::AuthFailed {
                status: response.status(),
                request_headers: response.request_headers().to_string(),
            });
        }

        let token = response
            .header(TOKEN_HEADER)
            .ok_or(ClientError::TokenHeaderMissing)?;
        info!("Authorized storage user");
        Ok(AuthToken::new(token))
    }
}
