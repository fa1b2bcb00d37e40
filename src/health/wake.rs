//! Cold-start wake sequence.

use std::time::Duration;
use tokio::time;

use crate::client::ApiClient;

impl ApiClient {
    /// Ping a possibly sleeping backend until it answers.
    ///
    /// Best effort: never fails, returns whether the server ended up online.
    pub async fn wake_server_sequence(&self) -> bool {
        if self.is_server_ready() {
            tracing::debug!("Server already awake, skipping wake sequence");
            return true;
        }

        let max_pings = self.inner.config.wake.max_pings;
        let interval = Duration::from_millis(self.inner.config.wake.ping_interval_ms);
        tracing::info!(max_pings, "Waking server");

        for ping in 1..=max_pings {
            let timeout = self.inner.retry_policy.schedule.for_attempt(ping);
            tracing::debug!(ping, timeout_ms = timeout.as_millis() as u64, "Wake ping");

            if self.check_server_health(timeout).await {
                tracing::info!(ping, "Server is awake");
                return true;
            }

            if ping < max_pings {
                time::sleep(interval).await;
            }
        }

        tracing::warn!(max_pings, "Server did not respond to wake sequence");
        self.server_status().is_online == Some(true)
    }
}
