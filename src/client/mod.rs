//! API client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (screen/service):
//!     → ApiClient::send / send_with_retry
//!     → attach bearer token (auth/store.rs)
//!     → dispatch with per-attempt deadline
//!     → 2xx: status tracker marks server online/awake
//!     → 401: auth/refresh.rs single-flight refresh, replay once
//!     → timeout / no response / 503: resilience/retries.rs
//! ```
//!
//! # Design Decisions
//! - One handle per backend, cheap to clone, shared by every caller
//! - All mutable state lives behind the handle, never in globals
//! - Tokens are re-read from the store for every dispatch

pub mod error;
pub mod request;

use reqwest::StatusCode;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::auth::refresh::RefreshCoordinator;
use crate::auth::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError};
use crate::health::state::StatusTracker;
use crate::lifecycle::periodic::PeriodicTask;
use crate::observability::metrics;
use crate::resilience::retries::{retry_with_progressive_timeout, RetryPolicy};

pub use error::{ApiError, RefreshError};
pub use request::{ApiRequest, ApiResponse, Method};

/// Handle to the backend API.
///
/// Clones share the same credentials, status, refresh state and loops.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) config: ClientConfig,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) status: StatusTracker,
    pub(crate) refresh: Arc<RefreshCoordinator>,
    pub(crate) keep_alive: Mutex<Option<PeriodicTask>>,
    pub(crate) monitor: Mutex<Option<PeriodicTask>>,
    pub(crate) foregrounded: AtomicBool,
}

impl ApiClient {
    /// Create a client for `config.api.base_url` backed by `credentials`.
    ///
    /// The configuration is validated here, whatever path produced it.
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let base_url = Url::parse(&config.api.base_url).map_err(|e| {
            ApiError::InvalidRequest(format!("Invalid base URL '{}': {}", config.api.base_url, e))
        })?;

        let mut builder = reqwest::Client::builder().user_agent(config.api.user_agent.as_str());
        if !config.api.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;

        let retry_policy = RetryPolicy::from_config(&config.retries, &config.timeouts);
        let refresh = Arc::new(RefreshCoordinator::new(config.auth.max_pending_refreshes));

        tracing::info!(
            base_url = %base_url,
            max_attempts = retry_policy.max_attempts,
            "API client initialized"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                config,
                retry_policy,
                credentials,
                status: StatusTracker::new(),
                refresh,
                keep_alive: Mutex::new(None),
                monitor: Mutex::new(None),
                foregrounded: AtomicBool::new(true),
            }),
        })
    }

    /// Create a client whose credential store follows `auth.credentials_path`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let credentials: Arc<dyn CredentialStore> = match &config.auth.credentials_path {
            Some(path) => Arc::new(FileCredentialStore::open(path)?),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Self::new(config, credentials)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.inner.credentials.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    pub(crate) fn downgrade(&self) -> Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<ClientInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        Url::parse(&joined).map_err(|e| ApiError::InvalidRequest(format!("Invalid path '{}': {}", path, e)))
    }

    /// Send once with the default request deadline, recovering from 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.inner.credentials.access_token()?;
        let timeout = self.inner.config.timeouts.request_timeout();
        self.send_authorized(&request, token, timeout).await
    }

    /// Send with progressive-timeout retries using the configured policy.
    pub async fn send_with_retry(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.send_with_policy(&request, &self.inner.retry_policy).await
    }

    /// Send with progressive-timeout retries, capped at `max_attempts`.
    pub async fn send_with_retries(&self, request: ApiRequest, max_attempts: u32) -> Result<ApiResponse, ApiError> {
        let policy = self.inner.retry_policy.clone().with_max_attempts(max_attempts);
        self.send_with_policy(&request, &policy).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    async fn send_with_policy(&self, request: &ApiRequest, policy: &RetryPolicy) -> Result<ApiResponse, ApiError> {
        retry_with_progressive_timeout(policy, self.inner.credentials.as_ref(), move |attempt| async move {
            self.send_authorized(request, attempt.access_token, attempt.timeout).await
        })
        .await
    }

    /// Dispatch with `access_token`; on a first 401 obtain a fresh token and
    /// replay exactly once. A 401 on the replay is returned as-is.
    pub(crate) async fn send_authorized(
        &self,
        request: &ApiRequest,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        match self.dispatch(request, access_token.as_deref(), timeout).await {
            Err(ApiError::Status { status: 401, .. }) if request.refresh_on_unauthorized => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    "Unauthorized, recovering session before replay"
                );
                let token = self.recover_unauthorized(access_token.as_deref()).await?;
                self.dispatch(request, Some(&token), timeout).await
            }
            other => other,
        }
    }

    /// One round trip. Updates the server status from the outcome.
    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
        timeout: Duration,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoint(&request.path)?;
        let request_id = Uuid::new_v4();
        let method = request.method.as_str();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %request.path,
            timeout_ms = timeout.as_millis() as u64,
            "Dispatching request"
        );

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .timeout(timeout)
            .header("x-request-id", request_id.to_string());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(method, &request.path, e, timeout)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return Err(self.transport_failure(method, &request.path, e, timeout)),
        };

        if status.is_success() {
            self.inner.status.record_success();
            metrics::record_request(method, "success");
            return Ok(ApiResponse {
                status: status.as_u16(),
                headers,
                body,
            });
        }

        if status == StatusCode::SERVICE_UNAVAILABLE {
            self.inner.status.record_unavailable();
        }
        metrics::record_request(method, "error_status");

        let text = String::from_utf8_lossy(&body).into_owned();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: request::error_message(&text, status.as_u16()),
            body: text,
        })
    }

    fn transport_failure(&self, method: &str, path: &str, error: reqwest::Error, timeout: Duration) -> ApiError {
        if error.is_timeout() {
            self.inner.status.record_timeout();
            metrics::record_request(method, "timeout");
            tracing::debug!(method = %method, path = %path, timeout_ms = timeout.as_millis() as u64, "Request timed out");
            ApiError::Timeout { timeout }
        } else if error.is_builder() {
            ApiError::InvalidRequest(error.to_string())
        } else {
            self.inner.status.record_network_failure();
            metrics::record_request(method, "network_error");
            tracing::debug!(method = %method, path = %path, error = %error, "No response from server");
            ApiError::Network(error.to_string())
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("status", &self.inner.status.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        let mut config = ClientConfig::default();
        config.api.base_url = base_url.to_string();
        config.api.use_system_proxy = false;
        ApiClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("https://pets.example.com/api");
        assert_eq!(client.endpoint("/health").unwrap().as_str(), "https://pets.example.com/api/health");
        assert_eq!(client.endpoint("bookings/3").unwrap().as_str(), "https://pets.example.com/api/bookings/3");

        let client = self::client("https://pets.example.com/");
        assert_eq!(client.endpoint("/auth/refresh-token").unwrap().as_str(), "https://pets.example.com/auth/refresh-token");
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = ClientConfig::default();
        config.api.base_url = "::nope::".to_string();
        let err = ApiClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap_err();
        assert!(matches!(err, ApiError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_programmatic_config_is_validated() {
        let mut config = ClientConfig::default();
        config.auth.max_pending_refreshes = 0;
        config.wake.max_pings = 0;

        match ApiClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap_err() {
            ApiError::Config(ConfigError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["wake.max_pings", "auth.max_pending_refreshes"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) is closed on loopback in practice.
        let client = client("http://127.0.0.1:9");
        let err = client.get("/services").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));

        let status = client.inner.status.snapshot();
        assert_eq!(status.is_online, Some(false));
        assert_eq!(status.consecutive_failures, 1);
    }
}
