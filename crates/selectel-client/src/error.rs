//! Client error types

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Authorization request was rejected
    #[error("Authorization failed with status {status}. Request:\n\n{request_headers}")]
    AuthFailed {
        status: StatusCode,
        request_headers: String,
    },

    /// Authorization succeeded but the response carried no token
    #[error("Storage did not return a token upon authorization request")]
    TokenHeaderMissing,

    /// Storage responded with a non-success status
    #[error("Service responds code {status}. Request:\n\n{request_headers}")]
    Service {
        status: StatusCode,
        request_headers: String,
    },

    /// Remote object not found
    #[error("File {path} is not found")]
    ObjectNotFound { path: String },

    /// Local file does not exist
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// No credentials registered for the storage type
    #[error("There are no connection settings for storage '{0}'")]
    UnknownStorageType(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL could not be interpreted
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Token cache failure
    #[error("Token store error: {0}")]
    TokenStore(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Check if this is an authorization failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailed { .. } | Self::TokenHeaderMissing)
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
            || matches!(self, Self::Service { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::AuthFailed { status, .. } | Self::Service { status, .. } => Some(*status),
            Self::ObjectNotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}

impl From<redis::RedisError> for ClientError {
    fn from(err: redis::RedisError) -> Self {
        ClientError::TokenStore(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ClientError::AuthFailed {
            status: StatusCode::FORBIDDEN,
            request_headers: String::new(),
        };
        assert!(err.is_auth_error());
        assert!(ClientError::TokenHeaderMissing.is_auth_error());
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

        let err = ClientError::Service {
            status: StatusCode::NOT_FOUND,
            request_headers: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_auth_error());

        let err = ClientError::ObjectNotFound { path: "/a.txt".to_string() };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File /a.txt is not found");
    }

    #[test]
    fn test_service_error_message_includes_request() {
        let err = ClientError::Service {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            request_headers: "GET /container HTTP/1.1".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("GET /container HTTP/1.1"));
    }
}
