//! Server reachability state.
//!
//! # Transitions
//! ```text
//! any 2xx / healthy probe   → online, awake, failures = 0
//! timeout                   → failures += 1
//! no response               → failures += 1, offline
//! 503                       → failures += 1
//! failed probe              → failures += 1, offline
//! ```
//!
//! Updates happen under one lock acquisition, never across an await.

use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use crate::observability::metrics;

/// Snapshot of what the client knows about the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerStatus {
    /// Last known reachability; `None` until the first outcome.
    pub is_online: Option<bool>,
    pub last_checked: Option<SystemTime>,
    pub consecutive_failures: u32,
    /// A health check is in flight.
    pub is_checking: bool,
    /// A successful response has been observed; the cold start is over.
    pub is_awake: bool,
}

impl ServerStatus {
    /// Awake and known to be online.
    pub fn is_ready(&self) -> bool {
        self.is_awake && self.is_online == Some(true)
    }
}

/// Shared, lock-protected [`ServerStatus`].
#[derive(Debug, Default)]
pub struct StatusTracker {
    inner: Mutex<ServerStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ServerStatus {
        self.lock().clone()
    }

    pub fn record_success(&self) {
        let mut status = self.lock();
        status.consecutive_failures = 0;
        status.is_online = Some(true);
        status.is_awake = true;
        publish(&status);
    }

    pub fn record_timeout(&self) {
        let mut status = self.lock();
        status.consecutive_failures += 1;
        publish(&status);
    }

    pub fn record_network_failure(&self) {
        let mut status = self.lock();
        status.consecutive_failures += 1;
        status.is_online = Some(false);
        publish(&status);
    }

    pub fn record_unavailable(&self) {
        self.record_timeout();
    }

    pub fn record_probe_success(&self) {
        let mut status = self.lock();
        status.is_online = Some(true);
        status.is_awake = true;
        status.last_checked = Some(SystemTime::now());
        status.consecutive_failures = 0;
        publish(&status);
    }

    pub fn record_probe_failure(&self) {
        let mut status = self.lock();
        status.is_online = Some(false);
        status.last_checked = Some(SystemTime::now());
        status.consecutive_failures += 1;
        publish(&status);
    }

    /// Claim the single health-check slot.
    ///
    /// Returns `Err(last_known_online)` when a check is already in flight.
    pub fn try_begin_check(&self) -> Result<CheckGuard<'_>, bool> {
        let mut status = self.lock();
        if status.is_checking {
            return Err(status.is_online.unwrap_or(false));
        }
        status.is_checking = true;
        Ok(CheckGuard { tracker: self })
    }

    fn lock(&self) -> MutexGuard<'_, ServerStatus> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn publish(status: &ServerStatus) {
    metrics::record_server_status(status.is_online == Some(true), status.consecutive_failures);
}

/// Holds the health-check slot; released on drop.
#[derive(Debug)]
pub struct CheckGuard<'a> {
    tracker: &'a StatusTracker,
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        self.tracker.lock().is_checking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_outcomes() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.snapshot().is_online, None);

        tracker.record_timeout();
        tracker.record_timeout();
        let status = tracker.snapshot();
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.is_online, None);

        tracker.record_network_failure();
        let status = tracker.snapshot();
        assert_eq!(status.consecutive_failures, 3);
        assert_eq!(status.is_online, Some(false));
        assert!(!status.is_awake);

        tracker.record_success();
        let status = tracker.snapshot();
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.is_ready());
    }

    #[test]
    fn test_probe_outcomes_stamp_last_checked() {
        let tracker = StatusTracker::new();
        tracker.record_probe_failure();
        let status = tracker.snapshot();
        assert!(status.last_checked.is_some());
        assert_eq!(status.is_online, Some(false));
        assert_eq!(status.consecutive_failures, 1);

        tracker.record_probe_success();
        assert!(tracker.snapshot().is_ready());
    }

    #[test]
    fn test_check_guard_is_exclusive() {
        let tracker = StatusTracker::new();
        tracker.record_success();

        let guard = tracker.try_begin_check().unwrap();
        assert!(tracker.snapshot().is_checking);
        assert_eq!(tracker.try_begin_check().unwrap_err(), true);

        drop(guard);
        assert!(!tracker.snapshot().is_checking);
        assert!(tracker.try_begin_check().is_ok());
    }
}
