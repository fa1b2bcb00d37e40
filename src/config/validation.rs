//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module catches values that parse
//! but cannot work (unparseable base URL, zero timeouts, empty schedules).
//! Every problem is reported, not just the first.

use std::fmt;
use url::Url;
use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.base_url", e.to_string())),
    }

    if !config.api.health_path.starts_with('/') {
        errors.push(ValidationError::new("api.health_path", "must start with '/'"));
    }
    if !config.api.refresh_path.starts_with('/') {
        errors.push(ValidationError::new("api.refresh_path", "must start with '/'"));
    }

    if config.timeouts.initial_ms == 0 {
        errors.push(ValidationError::new("timeouts.initial_ms", "must be greater than 0"));
    }
    if config.timeouts.max_ms < config.timeouts.initial_ms {
        errors.push(ValidationError::new(
            "timeouts.max_ms",
            "must be at least timeouts.initial_ms",
        ));
    }
    if config.timeouts.progressive_ms.iter().any(|ms| *ms == 0) {
        errors.push(ValidationError::new("timeouts.progressive_ms", "entries must be greater than 0"));
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_delay_ms < config.retries.delay_step_ms {
        errors.push(ValidationError::new(
            "retries.max_delay_ms",
            "must be at least retries.delay_step_ms",
        ));
    }

    if config.wake.max_pings == 0 {
        errors.push(ValidationError::new("wake.max_pings", "must be at least 1"));
    }
    if config.keep_alive.interval_ms == 0 {
        errors.push(ValidationError::new("keep_alive.interval_ms", "must be greater than 0"));
    }
    if config.monitoring.interval_ms == 0 {
        errors.push(ValidationError::new("monitoring.interval_ms", "must be greater than 0"));
    }
    if config.health.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("health.probe_timeout_ms", "must be greater than 0"));
    }
    if config.health.poll_interval_ms == 0 {
        errors.push(ValidationError::new("health.poll_interval_ms", "must be greater than 0"));
    }

    if config.auth.max_pending_refreshes == 0 {
        errors.push(ValidationError::new("auth.max_pending_refreshes", "must be at least 1"));
    }
    if config.auth.refresh_timeout_ms == 0 {
        errors.push(ValidationError::new("auth.refresh_timeout_ms", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
