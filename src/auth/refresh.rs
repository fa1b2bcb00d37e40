//! Single-flight token refresh.
//!
//! # States
//! - Idle: no refresh outstanding
//! - Refreshing: the first caller (the leader) spawns the refresh; everyone
//!   else who needs a token queues a oneshot and waits
//!
//! # State Transitions
//! ```text
//! Idle → Refreshing: first caller becomes leader and spawns the refresh task
//! Refreshing → Idle: refresh settles; leader then waiters get the same outcome, FIFO
//! Refreshing → Idle: refresh task dies before settling; everyone gets Abandoned
//! ```
//!
//! The refresh runs in its own task, so dropping the leader's request does
//! not cancel it. Callers only stop waiting.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::client::error::RefreshError;
use crate::observability::metrics;

type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    is_refreshing: bool,
    leader: Option<oneshot::Sender<RefreshOutcome>>,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Coordinates refreshes so that at most one is outstanding at a time.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    max_waiters: usize,
}

impl RefreshCoordinator {
    pub fn new(max_waiters: usize) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            max_waiters,
        }
    }

    /// True while a refresh is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.lock().is_refreshing
    }

    /// Number of callers queued behind the leader.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Spawn `refresh` if no refresh is outstanding, otherwise wait for the
    /// outstanding one. Every caller observes the same outcome.
    pub async fn run_or_join<F, Fut>(self: &Arc<Self>, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let leader = {
            let mut state = self.lock();
            if state.is_refreshing {
                if state.waiters.len() >= self.max_waiters {
                    tracing::warn!(waiters = state.waiters.len(), "Refresh queue full, rejecting request");
                    return Err(RefreshError::QueueFull);
                }
                state.waiters.push_back(tx);
                false
            } else {
                state.is_refreshing = true;
                state.leader = Some(tx);
                true
            }
        };

        if leader {
            let guard = InFlight { coordinator: Arc::clone(self), settled: false };
            let refresh = refresh();
            tokio::spawn(async move {
                let outcome = refresh.await;
                metrics::record_token_refresh(outcome.is_ok());
                guard.settle(&outcome);
            });
        } else {
            tracing::debug!("Token refresh in flight, queued behind it");
        }

        rx.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Back to Idle and hand the outcome to the leader and every waiter, in
    /// arrival order.
    fn finish(&self, outcome: &RefreshOutcome) {
        let (leader, waiters) = {
            let mut state = self.lock();
            state.is_refreshing = false;
            (state.leader.take(), std::mem::take(&mut state.waiters))
        };

        if !waiters.is_empty() {
            tracing::debug!(waiters = waiters.len(), success = outcome.is_ok(), "Releasing queued requests");
        }
        // A caller whose request was dropped is simply skipped.
        for waiter in leader.into_iter().chain(waiters) {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// The refresh task's claim on the Refreshing state. Released on every exit
/// path, including a panic inside the refresh.
struct InFlight {
    coordinator: Arc<RefreshCoordinator>,
    settled: bool,
}

impl InFlight {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.finish(outcome);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh ended before settling");
            self.coordinator.finish(&Err(RefreshError::Abandoned));
        }
    }
}
