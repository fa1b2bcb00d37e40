//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client, probes and loops produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout log
//!     → Prometheus scrape (agent binary, optional)
//! ```

pub mod logging;
pub mod metrics;
