//! Error types for the API client.

use std::time::Duration;
use thiserror::Error;

use crate::auth::store::StoreError;
use crate::config::ConfigError;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was aborted locally after its deadline.
    #[error("request timed out after {}ms", timeout.as_millis())]
    Timeout { timeout: Duration },

    /// No response was received at all.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        body: String,
    },

    /// The session could not be recovered; stored credentials were cleared.
    #[error("authentication failed: {0}")]
    Auth(#[from] RefreshError),

    /// Credential storage failed.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// The client was built from a configuration that fails validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The request could not be built (bad path, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Timeouts, dropped connections and 503s are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout { .. } | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status == 503,
            _ => false,
        }
    }

    /// The stored session is gone; the caller has to send the user back
    /// through login.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Auth(e) if e.clears_session())
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome of a failed token refresh.
///
/// Cloned to every request that waited on the same refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token is stored.
    #[error("no refresh token available")]
    Unavailable,

    /// The refresh endpoint answered with an error status.
    #[error("refresh endpoint returned {status}")]
    Rejected { status: u16 },

    /// A 2xx refresh response without an access token.
    #[error("refresh response did not contain an access token")]
    MissingAccessToken,

    /// The refresh call itself never got an answer.
    #[error("refresh request failed: {0}")]
    Transport(String),

    /// Reading or writing the credential store failed.
    #[error("credential store error: {0}")]
    Store(String),

    /// Too many requests are already waiting on the in-flight refresh.
    #[error("too many requests waiting for token refresh")]
    QueueFull,

    /// The refresh task ended before it settled.
    #[error("token refresh was abandoned")]
    Abandoned,
}

impl RefreshError {
    /// Failures raised by the refresh exchange itself, after which the
    /// stored tokens are erased. `QueueFull` and `Abandoned` leave the
    /// session in place.
    pub fn clears_session(&self) -> bool {
        !matches!(self, RefreshError::QueueFull | RefreshError::Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            message: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_retryable_classes() {
        assert!(ApiError::Timeout { timeout: Duration::from_secs(5) }.is_retryable());
        assert!(ApiError::Network("connection refused".into()).is_retryable());
        assert!(status(503).is_retryable());

        assert!(!status(500).is_retryable());
        assert!(!status(502).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!ApiError::Auth(RefreshError::Unavailable).is_retryable());
    }

    #[test]
    fn test_requires_login() {
        assert!(ApiError::Auth(RefreshError::Rejected { status: 403 }).requires_login());
        assert!(ApiError::Auth(RefreshError::Unavailable).requires_login());
        assert!(ApiError::Auth(RefreshError::Transport("reset".into())).requires_login());
        assert!(!status(401).requires_login());
    }

    #[test]
    fn test_transient_refresh_failures_keep_session() {
        assert!(!ApiError::Auth(RefreshError::QueueFull).requires_login());
        assert!(!ApiError::Auth(RefreshError::Abandoned).requires_login());
    }
}
