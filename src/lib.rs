//! Resilient API client for a backend that sleeps when idle.
//!
//! Screens and services talk to the backend through [`ApiClient`], which
//! layers bearer authentication, single-flight token refresh, progressive
//! timeout retries, health probing, a cold-start wake sequence and a
//! foreground keep-alive loop over plain HTTP requests.

pub mod auth;
pub mod client;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use auth::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use client::{ApiClient, ApiError, ApiRequest, ApiResponse, RefreshError};
pub use config::ClientConfig;
pub use health::ServerStatus;
pub use lifecycle::AppState;
