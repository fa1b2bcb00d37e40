//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the resilient API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin and endpoint paths.
    pub api: ApiConfig,

    /// Per-attempt timeout schedule.
    pub timeouts: TimeoutConfig,

    /// Progressive retry settings.
    pub retries: RetryConfig,

    /// Cold-start wake sequence settings.
    pub wake: WakeConfig,

    /// Foreground keep-alive pinger.
    pub keep_alive: KeepAliveConfig,

    /// Background server monitoring loop.
    pub monitoring: MonitoringConfig,

    /// Health probe settings.
    pub health: HealthConfig,

    /// Token refresh and credential storage.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin every request path is joined onto.
    pub base_url: String,

    /// Lightweight health endpoint.
    pub health_path: String,

    /// Token refresh endpoint.
    pub refresh_path: String,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Honor HTTP(S)_PROXY from the environment.
    pub use_system_proxy: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            health_path: "/health".to_string(),
            refresh_path: "/auth/refresh-token".to_string(),
            user_agent: concat!("resilient-client/", env!("CARGO_PKG_VERSION")).to_string(),
            use_system_proxy: true,
        }
    }
}

/// Timeout configuration in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for the first attempt.
    pub initial_ms: u64,

    /// Budgets for attempts 2..N.
    pub progressive_ms: Vec<u64>,

    /// Upper bound for any attempt.
    pub max_ms: u64,

    /// Deadline for a plain (non-retried) request.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            initial_ms: 5_000,
            progressive_ms: vec![10_000, 15_000, 20_000, 30_000, 45_000],
            max_ms: 60_000,
            request_ms: 30_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay grows by this step per failed attempt.
    pub delay_step_ms: u64,

    /// Upper bound for the inter-attempt delay.
    pub max_delay_ms: u64,

    /// No new attempt starts once this much time has elapsed.
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            delay_step_ms: 2_000,
            max_delay_ms: 8_000,
            max_elapsed_ms: 180_000,
        }
    }
}

/// Wake sequence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Maximum number of pings before giving up.
    pub max_pings: u32,

    /// Pause between two pings.
    pub ping_interval_ms: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            max_pings: 6,
            ping_interval_ms: 2_000,
        }
    }
}

/// Keep-alive configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Start the pinger when the agent boots.
    pub enabled: bool,

    /// Probe period while foregrounded.
    pub interval_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 25_000,
        }
    }
}

/// Server monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Start the monitor when the agent boots.
    pub enabled: bool,

    /// Probe period.
    pub interval_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 30_000,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Timeout used by the monitoring and keep-alive probes.
    pub probe_timeout_ms: u64,

    /// Poll period used by `wait_for_server`.
    pub poll_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            poll_interval_ms: 2_000,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Deadline for the refresh call.
    pub refresh_timeout_ms: u64,

    /// Requests allowed to wait on one in-flight refresh.
    pub max_pending_refreshes: usize,

    /// JSON credential file. In-memory storage when unset.
    pub credentials_path: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_timeout_ms: 15_000,
            max_pending_refreshes: 64,
            credentials_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl TimeoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

impl HealthConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AuthConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://pets.example.com/api"

            [retries]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://pets.example.com/api");
        assert_eq!(config.api.health_path, "/health");
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.delay_step_ms, 2_000);
        assert_eq!(config.timeouts.progressive_ms.len(), 5);
        assert_eq!(config.keep_alive.interval_ms, 25_000);
        assert_eq!(config.monitoring.interval_ms, 30_000);
    }
}
