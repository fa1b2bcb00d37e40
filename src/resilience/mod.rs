//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (deadline for this attempt)
//!     → On transient failure: retries.rs (retry with a larger deadline)
//!     → backoff.rs (linear delay between attempts)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - Deadlines escalate because a cold backend needs time to boot
//! - Only transient failures are retried

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{retry_with_progressive_timeout, Attempt, RetryPolicy};
pub use timeouts::TimeoutSchedule;
