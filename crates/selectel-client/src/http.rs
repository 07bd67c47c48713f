//! HTTP plumbing: request description, response value and executor

use crate::{ClientError, Config, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::{header, redirect, Client, Method, Request, Response, StatusCode};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Timeout of the streaming download request
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops followed by the streaming download request
pub const DOWNLOAD_MAX_REDIRECTS: usize = 4;

/// Headers whose values never appear in diagnostics
const MASKED_HEADERS: &[&str] = &["x-auth-key"];

/// Body of an outgoing request
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Local file streamed from disk, reopened on every send
    File { path: PathBuf, len: u64 },
}

/// Description of one HTTP request. Cheap to clone so a request can be
/// rebuilt and sent again.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Append a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace every header with this name, or append it
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Response of one HTTP request
#[derive(Clone, Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: header::HeaderMap,
    body: Bytes,
    request_headers: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: header::HeaderMap, body: Bytes, request_headers: String) -> Self {
        Self {
            status,
            headers,
            body,
            request_headers,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status in `[200, 300)`
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Header value, `None` when absent or not valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn headers(&self) -> &header::HeaderMap {
        &self.headers
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header(header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Rendered headers of the request that produced this response
    pub fn request_headers(&self) -> &str {
        &self.request_headers
    }
}

/// Sends requests and keeps the header text of the last exchange
pub struct HttpExecutor {
    http: Client,
    download: Client,
    /// Headers both clients add to every request
    default_headers: header::HeaderMap,
    last_request: Mutex<String>,
    last_response: Mutex<String>,
}

impl HttpExecutor {
    /// Create an executor with the given configuration
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ClientError::Config(format!("invalid user agent: {}", e)))?,
        );

        let mut builder = Client::builder()
            .default_headers(headers.clone())
            .redirect(redirect::Policy::none());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Http)?;

        let download = Client::builder()
            .default_headers(headers.clone())
            .redirect(redirect::Policy::limited(DOWNLOAD_MAX_REDIRECTS))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http,
            download,
            default_headers: headers,
            last_request: Mutex::new(String::new()),
            last_response: Mutex::new(String::new()),
        })
    }

    /// Send a request and buffer the whole response
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let req = self.build(&self.http, request).await?;
        let request_headers = self.record_request(&req);

        let response = self.http.execute(req).await?;
        self.record_response(&response);

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "received response");

        Ok(HttpResponse::new(status, headers, body, request_headers))
    }

    /// Send a GET following redirects and stream the body into `path`.
    /// The body is written whatever the status; the status is returned.
    pub async fn download_to_file(&self, request: &HttpRequest, path: &Path) -> Result<StatusCode> {
        let req = self.build(&self.download, request).await?;
        self.record_request(&req);

        let mut response = self.download.execute(req).await?;
        self.record_response(&response);
        let status = response.status();

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(status = status.as_u16(), bytes = written, path = %path.display(), "download finished");

        Ok(status)
    }

    /// Header text of the last sent request
    pub fn last_request_headers(&self) -> String {
        self.last_request.lock().clone()
    }

    /// Header text of the last received response
    pub fn last_response_headers(&self) -> String {
        self.last_response.lock().clone()
    }

    async fn build(&self, client: &Client, request: &HttpRequest) -> Result<Request> {
        let mut builder = client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::File { path, len } => {
                let file = tokio::fs::File::open(path).await?;
                builder.header(header::CONTENT_LENGTH, *len).body(file)
            }
        };

        Ok(builder.build()?)
    }

    fn record_request(&self, req: &Request) -> String {
        debug!("Sending {} request to {}", req.method(), req.url());
        let rendered = render_request(req, &self.default_headers);
        *self.last_request.lock() = rendered.clone();
        rendered
    }

    fn record_response(&self, response: &Response) {
        *self.last_response.lock() = render_response(response);
    }
}

/// Request line and headers as sent, including the client defaults
/// reqwest adds at send time
fn render_request(req: &Request, defaults: &header::HeaderMap) -> String {
    let url = req.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", req.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(out, "Host: {}:{}\r\n", host, port);
            }
            None => {
                let _ = write!(out, "Host: {}\r\n", host);
            }
        }
    }
    render_headers(&mut out, req.headers());
    for (name, value) in defaults {
        if !req.headers().contains_key(name) {
            render_header(&mut out, name, value);
        }
    }
    out
}

fn render_response(response: &Response) -> String {
    let status = response.status();
    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    render_headers(&mut out, response.headers());
    out
}

fn render_headers(out: &mut String, headers: &header::HeaderMap) {
    for (name, value) in headers {
        render_header(out, name, value);
    }
}

fn render_header(out: &mut String, name: &header::HeaderName, value: &header::HeaderValue) {
    let value = if MASKED_HEADERS.contains(&name.as_str()) {
        "********"
    } else {
        value.to_str().unwrap_or("<binary>")
    };
    let _ = write!(out, "{}: {}\r\n", name, value);
}
