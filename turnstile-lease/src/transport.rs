//! The lease authority abstraction.
//!
//! A transport enforces the capacity pool. [`crate::LocalPool`] is the
//! in-process implementation; a remote authority implements the same trait
//! and reports the same error kinds.

use crate::error::LeaseResult;
use crate::lease::FloatingLease;
use async_trait::async_trait;
use std::time::Duration;

/// Grants, renews and takes back floating lease slots.
#[async_trait]
pub trait LeaseTransport: Send + Sync {
    /// Takes a slot of `product` for `holder`, waiting up to `wait` for one
    /// to become free.
    ///
    /// Must be cancel-safe: dropping the returned future before it completes
    /// must not leave a slot granted.
    async fn acquire_slot(
        &self,
        holder: &str,
        product: &str,
        wait: Duration,
    ) -> LeaseResult<FloatingLease>;

    /// Returns the slot held by `lease` to the pool.
    async fn release_slot(&self, lease: &FloatingLease) -> LeaseResult<()>;

    /// Extends `lease` and returns its updated state.
    async fn renew_slot(&self, lease: &FloatingLease) -> LeaseResult<FloatingLease>;
}
