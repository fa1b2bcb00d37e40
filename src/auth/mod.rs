//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request gets 401:
//!     → refresh.rs (join or start the single in-flight refresh)
//!     → session.rs (POST refresh endpoint, persist or clear tokens)
//!     → store.rs (accessToken / refreshToken)
//!     → original request replayed once with the new token
//! ```
//!
//! # Design Decisions
//! - One refresh at a time; concurrent 401s wait on it in FIFO order
//! - A failed refresh clears both tokens so no loop can retry it
//! - The replay is never refreshed again

pub mod refresh;
pub mod session;
pub mod store;

pub use refresh::RefreshCoordinator;
pub use store::{CredentialKey, CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError};
