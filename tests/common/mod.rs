//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use axum::Router;
use tokio::net::TcpListener;

use resilient_client::config::ClientConfig;
use resilient_client::{ApiClient, MemoryCredentialStore};

/// Serve `router` on an ephemeral loopback port.
pub async fn start_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

/// Configuration pointing at `addr` with every delay shrunk for tests.
pub fn test_config(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = format!("http://{}", addr);
    config.api.use_system_proxy = false;

    config.timeouts.initial_ms = 200;
    config.timeouts.progressive_ms = vec![300, 400, 500];
    config.timeouts.max_ms = 1_000;
    config.timeouts.request_ms = 1_000;

    config.retries.delay_step_ms = 50;
    config.retries.max_delay_ms = 200;
    config.retries.max_elapsed_ms = 10_000;

    config.wake.ping_interval_ms = 50;
    config.keep_alive.interval_ms = 100;
    config.monitoring.interval_ms = 100;
    config.health.probe_timeout_ms = 500;
    config.health.poll_interval_ms = 50;
    config.auth.refresh_timeout_ms = 2_000;
    config
}

pub fn client_with(config: ClientConfig, store: MemoryCredentialStore) -> ApiClient {
    ApiClient::new(config, Arc::new(store)).unwrap()
}

pub fn client_for(addr: SocketAddr, store: MemoryCredentialStore) -> ApiClient {
    client_with(test_config(addr), store)
}

/// Shared hit counter for handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicU32>);

impl Hits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the 1-based hit number.
    pub fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
