//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active checks (probe.rs):
//!     GET /health
//!     → Update state.rs
//!
//! Passive checks (client dispatch):
//!     Request outcome observed
//!     → Update state.rs
//!
//! Cold start (wake.rs):
//!     Escalating-timeout pings until the backend answers
//!
//! Loops (monitor.rs):
//!     Server monitor and foreground keep-alive
//! ```
//!
//! # Design Decisions
//! - At most one health check in flight; concurrent callers get the last result
//! - Probe failures are logged and counted, never returned as errors

pub mod monitor;
pub mod probe;
pub mod state;
pub mod wake;

pub use state::{ServerStatus, StatusTracker};
