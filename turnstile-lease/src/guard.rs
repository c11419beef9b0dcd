//! Scoped lease acquisition.

use crate::error::LeaseResult;
use crate::lease::FloatingLease;
use crate::manager::FloatingLeaseManager;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::warn;

/// A held lease that is released when the guard goes away.
///
/// Prefer [`LeaseGuard::release`], which reports the outcome. Dropping the
/// guard instead spawns the release on the current tokio runtime; outside a
/// runtime the lease is left for the authority to reclaim.
#[must_use = "dropping the guard releases the lease"]
pub struct LeaseGuard {
    manager: Arc<FloatingLeaseManager>,
    lease: FloatingLease,
    released: bool,
}

impl LeaseGuard {
    #[must_use]
    pub fn lease(&self) -> &FloatingLease {
        &self.lease
    }

    /// Releases the lease now.
    pub async fn release(mut self) -> LeaseResult<()> {
        self.released = true;
        self.manager
            .release(&self.lease.holder, &self.lease.product)
            .await
    }
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("lease", &self.lease)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let manager = Arc::clone(&self.manager);
        let lease = self.lease.clone();
        match Handle::try_current() {
            Ok(handle) => {
                warn!(%lease, "lease guard dropped, releasing in background");
                handle.spawn(async move {
                    if let Err(e) = manager.release(&lease.holder, &lease.product).await {
                        warn!(%lease, error = %e, "background lease release failed");
                    }
                });
            }
            Err(_) => {
                warn!(%lease, "lease guard dropped outside a runtime, lease left to expire");
            }
        }
    }
}

impl FloatingLeaseManager {
    /// Acquires a lease wrapped in a [`LeaseGuard`].
    pub async fn acquire_guard(
        self: &Arc<Self>,
        holder: &str,
        product: &str,
    ) -> LeaseResult<LeaseGuard> {
        let lease = self.acquire(holder, product).await?;
        Ok(LeaseGuard {
            manager: Arc::clone(self),
            lease,
            released: false,
        })
    }

    /// Runs `f` while holding a lease of `product` for `holder`.
    ///
    /// The lease is released after `f` completes. If `f` panics or the
    /// returned future is dropped, the guard's drop releases it instead.
    /// A failed release is logged and `f`'s output is still returned; by then
    /// the work is done and the authority reclaims the slot on its own.
    ///
    /// # Errors
    ///
    /// Any error from acquiring the lease, in which case `f` never runs.
    pub async fn with_lease<F, Fut, T>(
        self: &Arc<Self>,
        holder: &str,
        product: &str,
        f: F,
    ) -> LeaseResult<T>
    where
        F: FnOnce(FloatingLease) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.acquire_guard(holder, product).await?;
        let lease = guard.lease().clone();
        let output = f(lease.clone()).await;
        if let Err(e) = guard.release().await {
            warn!(%lease, error = %e, "lease release after use failed");
        }
        Ok(output)
    }
}
