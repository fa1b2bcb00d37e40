//! Foreground/background gate for the keep-alive loop.
//!
//! The host runtime reports app state transitions; the client only pings the
//! backend while the app is in the foreground.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::ApiClient;

/// Host app lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    Active,
    Background,
    Inactive,
}

impl AppState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, AppState::Active)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppState::Active => "active",
            AppState::Background => "background",
            AppState::Inactive => "inactive",
        };
        f.write_str(name)
    }
}

impl FromStr for AppState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" | "foreground" => Ok(AppState::Active),
            "background" => Ok(AppState::Background),
            "inactive" => Ok(AppState::Inactive),
            other => Err(format!("unknown app state '{}'", other)),
        }
    }
}

impl ApiClient {
    /// True while the host app is foregrounded.
    pub fn is_app_foregrounded(&self) -> bool {
        self.inner.foregrounded.load(Ordering::SeqCst)
    }

    /// React to a lifecycle transition: resume pinging in the foreground,
    /// stop in the background.
    pub fn handle_app_state_change(&self, state: AppState) {
        let was_foreground = self.inner.foregrounded.swap(state.is_foreground(), Ordering::SeqCst);
        tracing::info!(state = %state, was_foreground, "App state changed");

        if state.is_foreground() {
            self.start_keep_alive();
        } else {
            self.stop_keep_alive();
        }
    }

    /// Follow an external lifecycle signal until its sender is dropped.
    ///
    /// The current value is applied immediately.
    pub fn spawn_app_state_listener(&self, mut states: watch::Receiver<AppState>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let initial = *states.borrow_and_update();
            client.handle_app_state_change(initial);

            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                client.handle_app_state_change(state);
            }
            tracing::debug!("App state source closed");
        })
    }
}
