//! Shared test helpers for lease tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use turnstile_lease::{
    FloatingLease, FloatingLeaseManager, LeaseConfig, LeaseError, LeaseResult, LeaseTransport,
    LocalPool,
};

pub const PRODUCT: &str = "ProductX";

pub fn config(capacity: u32) -> LeaseConfig {
    LeaseConfig::default()
        .with_capacity(capacity)
        .with_acquire_timeout(Duration::from_secs(1))
        .with_lease_ttl(Some(Duration::from_secs(60)))
}

/// A manager over a local pool the test can inspect.
pub fn local(config: LeaseConfig) -> (Arc<FloatingLeaseManager>, Arc<LocalPool>) {
    let pool = Arc::new(LocalPool::new(&config));
    let manager = Arc::new(FloatingLeaseManager::new(pool.clone(), config));
    (manager, pool)
}

/// Yields until `cond` holds, for background tasks spawned on drop.
pub async fn settle(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

/// A transport whose authority is unreachable.
#[derive(Default)]
pub struct UnreachableTransport {
    pub attempts: AtomicU32,
}

#[async_trait]
impl LeaseTransport for UnreachableTransport {
    async fn acquire_slot(
        &self,
        _holder: &str,
        _product: &str,
        _wait: Duration,
    ) -> LeaseResult<FloatingLease> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LeaseError::Transport("connection refused".into()))
    }

    async fn release_slot(&self, _lease: &FloatingLease) -> LeaseResult<()> {
        Err(LeaseError::Transport("connection refused".into()))
    }

    async fn renew_slot(&self, _lease: &FloatingLease) -> LeaseResult<FloatingLease> {
        Err(LeaseError::Transport("connection refused".into()))
    }
}
