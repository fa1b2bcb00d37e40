//! Background probing loops.
//!
//! Two independent loops share the health probe:
//! - server monitoring: every `monitoring.interval_ms`
//! - keep-alive: every `keep_alive.interval_ms`, only while foregrounded
//!
//! Both start with an immediate probe, and both are idempotent start/stop
//! pairs keyed on the presence of their task handle.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::client::ApiClient;
use crate::lifecycle::periodic::{PeriodicTask, TickFlow};

fn slot(task: &Mutex<Option<PeriodicTask>>) -> MutexGuard<'_, Option<PeriodicTask>> {
    task.lock().unwrap_or_else(|e| e.into_inner())
}

fn is_running(task: &Option<PeriodicTask>) -> bool {
    task.as_ref().is_some_and(|t| !t.is_finished())
}

impl ApiClient {
    /// Start the periodic server monitor. No-op if already running.
    pub fn start_server_monitoring(&self) {
        let mut monitor = slot(&self.inner.monitor);
        if is_running(&monitor) {
            tracing::debug!("Server monitoring already running");
            return;
        }

        let period = Duration::from_millis(self.inner.config.monitoring.interval_ms);
        let weak = self.downgrade();
        *monitor = Some(PeriodicTask::spawn("server-monitor", period, true, move || {
            let weak = weak.clone();
            async move {
                let Some(client) = ApiClient::upgrade(&weak) else {
                    return TickFlow::Break;
                };
                let healthy = client.check_server_health(client.inner.config.health.probe_timeout()).await;
                tracing::debug!(healthy, "Server monitor tick");
                TickFlow::Continue
            }
        }));

        tracing::info!(interval_ms = period.as_millis() as u64, "Server monitoring started");
    }

    /// Stop the server monitor. Idempotent.
    pub fn stop_server_monitoring(&self) {
        if let Some(task) = slot(&self.inner.monitor).take() {
            let _ = task.stop();
            tracing::info!("Server monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        is_running(&slot(&self.inner.monitor))
    }

    /// Start the keep-alive pinger. No-op if already running.
    ///
    /// The first probe fires right away; later ones are skipped while the
    /// app is not in the foreground.
    pub fn start_keep_alive(&self) {
        let mut keep_alive = slot(&self.inner.keep_alive);
        if is_running(&keep_alive) {
            tracing::debug!("Keep-alive already running");
            return;
        }

        let period = Duration::from_millis(self.inner.config.keep_alive.interval_ms);
        let weak = self.downgrade();
        let mut first_tick = true;
        *keep_alive = Some(PeriodicTask::spawn("keep-alive", period, true, move || {
            let weak = weak.clone();
            let gated = !std::mem::replace(&mut first_tick, false);
            async move {
                let Some(client) = ApiClient::upgrade(&weak) else {
                    return TickFlow::Break;
                };
                if gated && !client.is_app_foregrounded() {
                    tracing::debug!("App in background, skipping keep-alive ping");
                    return TickFlow::Continue;
                }
                let healthy = client.check_server_health(client.inner.config.health.probe_timeout()).await;
                tracing::debug!(healthy, "Keep-alive ping");
                TickFlow::Continue
            }
        }));

        tracing::info!(interval_ms = period.as_millis() as u64, "Keep-alive started");
    }

    /// Stop the keep-alive pinger. Idempotent.
    pub fn stop_keep_alive(&self) {
        if let Some(task) = slot(&self.inner.keep_alive).take() {
            let _ = task.stop();
            tracing::info!("Keep-alive stopped");
        }
    }

    pub fn is_keep_alive_running(&self) -> bool {
        is_running(&slot(&self.inner.keep_alive))
    }

    /// Stop every background loop.
    pub fn shutdown(&self) {
        self.stop_keep_alive();
        self.stop_server_monitoring();
    }
}
