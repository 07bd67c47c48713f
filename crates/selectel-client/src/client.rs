//! Main client implementation

use crate::{
    http::{HttpExecutor, HttpRequest, HttpResponse, RequestBody},
    ClientError, Config, ContainerPath, ObjectPath, PublicHost, Result, StorageUser,
};
use reqwest::{Method, StatusCode};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Request header carrying the token
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Content type marking an object as a symlink
pub const SYMLINK_CONTENT_TYPE: &str = "x-storage/symlink";

/// Header with the symlink target
pub const SYMLINK_LOCATION_HEADER: &str = "X-Object-Meta-Location";

/// Client for one container, acting as one storage user.
///
/// Every authenticated operation sends its request with the current
/// token; a 401 triggers exactly one token refresh and one resend.
pub struct StorageClient {
    base_url: String,
    container: ContainerPath,
    public_host: PublicHost,
    user: StorageUser,
    http: Arc<HttpExecutor>,
}

impl StorageClient {
    /// Create a client for `container`
    pub fn new(
        config: &Config,
        http: Arc<HttpExecutor>,
        user: StorageUser,
        container: &str,
        public_host: &str,
    ) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            container: ContainerPath::new(container),
            public_host: PublicHost::new(public_host),
            user,
            http,
        }
    }

    pub fn container(&self) -> &ContainerPath {
        &self.container
    }

    pub fn public_host(&self) -> &PublicHost {
        &self.public_host
    }

    pub fn user(&self) -> &StorageUser {
        &self.user
    }

    // ==================== Object Operations ====================

    /// List every object in the container
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn list_files(&self) -> Result<Vec<String>> {
        let request = HttpRequest::new(Method::GET, self.container_url());
        let response = self.send_authorized(request).await?;
        if !response.is_success() {
            return Err(service_error(&response));
        }
        Ok(parse_file_list(&response.text()))
    }

    /// Upload a local file. Returns the final status; 200 and 201 mean
    /// the object was stored.
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn upload_file(&self, local_path: &Path, storage_path: &str) -> Result<StatusCode> {
        let len = match tokio::fs::metadata(local_path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(ClientError::FileNotFound(local_path.to_path_buf())),
        };
        let path = ObjectPath::new(storage_path);

        let request = HttpRequest::new(Method::PUT, self.object_url(&path)).body(RequestBody::File {
            path: local_path.to_path_buf(),
            len,
        });
        let response = self.send_authorized(request).await?;
        Ok(response.status())
    }

    /// Download the object addressed by `url` into `local_path`.
    ///
    /// Returns `true` when the written file is as long as the object's
    /// `Content-Length`. The streaming GET is not retried on a 401.
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn download_file(&self, url: &str, local_path: &Path) -> Result<bool> {
        let path = object_path_from_url(url)?;
        let object_url = self.object_url(&path);

        let not_found = || ClientError::ObjectNotFound {
            path: path.to_string(),
        };
        let head = match self
            .send_authorized(HttpRequest::new(Method::HEAD, object_url.clone()))
            .await
        {
            Ok(head) => head,
            // 404 on the resend after a refresh
            Err(ClientError::Service { status, .. }) if status == StatusCode::NOT_FOUND => {
                return Err(not_found())
            }
            Err(e) => return Err(e),
        };
        if head.status() == StatusCode::NOT_FOUND {
            return Err(not_found());
        }
        if !head.is_success() {
            return Err(service_error(&head));
        }

        let token = self.user.token().await?;
        let request = HttpRequest::new(Method::GET, object_url).header(AUTH_TOKEN_HEADER, token.into_string());
        let status = self.http.download_to_file(&request, local_path).await?;
        if !status.is_success() {
            warn!("Download of {} responded {}", path, status);
        }

        let Some(expected) = head.content_length() else {
            warn!("No Content-Length for {}, cannot verify download", path);
            return Ok(false);
        };
        let actual = tokio::fs::metadata(local_path).await?.len();
        debug!(expected, actual, "download size check");
        Ok(actual == expected)
    }

    /// Create `link_path` pointing at `origin_path` in the same container.
    /// The origin is not required to exist.
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn make_link(&self, origin_path: &str, link_path: &str) -> Result<StatusCode> {
        let origin = ObjectPath::new(origin_path);
        let link = ObjectPath::new(link_path);

        let request = HttpRequest::new(Method::PUT, self.object_url(&link))
            .header("Content-Type", SYMLINK_CONTENT_TYPE)
            .header(SYMLINK_LOCATION_HEADER, format!("{}{}", self.container, origin))
            .header("Content-Length", "0");
        let response = self.send_authorized(request).await?;
        Ok(response.status())
    }

    /// Delete an object. A 404 is returned as a status, not an error.
    #[instrument(skip(self), fields(container = %self.container))]
    pub async fn delete_file(&self, storage_path: &str) -> Result<StatusCode> {
        let path = ObjectPath::new(storage_path);
        let request = HttpRequest::new(Method::DELETE, self.object_url(&path));
        let response = self.send_authorized(request).await?;
        Ok(response.status())
    }

    /// Scheme-relative public link of an object
    pub fn public_url(&self, storage_path: &str) -> String {
        format!("//{}{}", self.public_host.as_str(), ObjectPath::new(storage_path))
    }

    /// Header text of the last request sent through the shared executor
    pub fn last_request_headers(&self) -> String {
        self.http.last_request_headers()
    }

    /// Header text of the last response received by the shared executor
    pub fn last_response_headers(&self) -> String {
        self.http.last_response_headers()
    }

    // ==================== Helper Methods ====================

    fn container_url(&self) -> String {
        format!("{}{}", self.base_url, self.container)
    }

    fn object_url(&self, path: &ObjectPath) -> String {
        format!("{}{}{}", self.base_url, self.container, path)
    }

    async fn send_authorized(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let token = self.user.token().await?;
        request.set_header(AUTH_TOKEN_HEADER, token.as_str());
        let response = self.http.execute(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Token rejected by storage, refreshing");
        let token = self.user.refresh_token(&token).await?;
        request.set_header(AUTH_TOKEN_HEADER, token.into_string());
        let response = self.http.execute(&request).await?;
        if !response.is_success() {
            return Err(service_error(&response));
        }
        Ok(response)
    }
}

fn service_error(response: &HttpResponse) -> ClientError {
    ClientError::Service {
        status: response.status(),
        request_headers: response.request_headers().to_string(),
    }
}

fn parse_file_list(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Path component of an absolute, scheme-relative or bare URL
fn object_path_from_url(raw: &str) -> Result<ObjectPath> {
    let absolute = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    };

    match Url::parse(&absolute) {
        Ok(url) => Ok(ObjectPath::new(url.path())),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = raw.split(|c| c == '?' || c == '#').next().unwrap_or_default();
            Ok(ObjectPath::new(path))
        }
        Err(e) => Err(ClientError::InvalidUrl(format!("{}: {}", raw, e))),
    }
}
