//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic loops (periodic.rs):
//!     start → tick every period → stop signal → exit after current tick
//!
//! App state (app_state.rs):
//!     Active → keep-alive on
//!     Background / Inactive → keep-alive off
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → agent stops its loops and exits
//! ```

pub mod app_state;
pub mod periodic;
pub mod signals;

pub use app_state::AppState;
pub use periodic::{PeriodicTask, TickFlow};
