//! Active health probing.
//!
//! # Responsibilities
//! - Probe the backend's health endpoint
//! - Update the shared server status from the result
//! - Poll until the backend answers (`wait_for_server`)

use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::{self, Instant};

use crate::client::ApiClient;
use crate::health::state::ServerStatus;
use crate::observability::metrics;

impl ApiClient {
    /// Snapshot of the server status.
    pub fn server_status(&self) -> ServerStatus {
        self.inner.status.snapshot()
    }

    /// The backend has answered and is believed to be online.
    pub fn is_server_ready(&self) -> bool {
        self.inner.status.snapshot().is_ready()
    }

    /// Probe the health endpoint once.
    ///
    /// While another check is in flight this returns the last known
    /// reachability without touching the network.
    pub async fn check_server_health(&self, timeout: Duration) -> bool {
        let _guard = match self.inner.status.try_begin_check() {
            Ok(guard) => guard,
            Err(last_known) => {
                tracing::debug!(last_known, "Health check already in flight");
                return last_known;
            }
        };

        let healthy = self.probe(timeout).await;
        if healthy {
            self.inner.status.record_probe_success();
        } else {
            self.inner.status.record_probe_failure();
        }
        metrics::record_health_check(healthy);

        healthy
    }

    /// Probe until the server is healthy or `max_wait` has passed.
    pub async fn wait_for_server(&self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        let probe_timeout = self.inner.config.health.probe_timeout();
        let poll_interval = self.inner.config.health.poll_interval();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if self.check_server_health(probe_timeout.min(remaining.max(Duration::from_millis(1)))).await {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(max_wait_ms = max_wait.as_millis() as u64, "Server did not become available");
                return false;
            }
            time::sleep(poll_interval.min(remaining)).await;
        }
    }

    async fn probe(&self, timeout: Duration) -> bool {
        let url = match self.endpoint(&self.inner.config.api.health_path) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build health check URL");
                return false;
            }
        };

        match self.inner.http.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let healthy = response.status() == StatusCode::OK;
                if !healthy {
                    tracing::warn!(status = %response.status(), "Health check failed: non-success status");
                }
                healthy
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Health check failed: timeout");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed: connection error");
                false
            }
        }
    }
}
