//! The floating lease manager.
//!
//! Tracks which (holder, product) pairs hold a lease from this client and
//! fronts a [`LeaseTransport`] that owns the capacity pool. Per pair the
//! states are `Unleased -> Pending -> Leased -> Unleased`; a second acquire
//! or an unmatched release is an error, never a no-op.

use crate::config::LeaseConfig;
use crate::error::{LeaseError, LeaseResult};
use crate::lease::FloatingLease;
use crate::pool::LocalPool;
use crate::transport::LeaseTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

type Key = (String, String);

#[derive(Debug, Clone)]
enum Slot {
    /// An acquire for this pair is in flight.
    Pending,
    Held(FloatingLease),
}

/// Acquires, renews and releases floating leases.
pub struct FloatingLeaseManager {
    transport: Arc<dyn LeaseTransport>,
    config: LeaseConfig,
    slots: Mutex<HashMap<Key, Slot>>,
}

/// Removes a pending slot unless the acquire completed.
struct Reservation<'a> {
    slots: &'a Mutex<HashMap<Key, Slot>>,
    key: Option<Key>,
}

impl Reservation<'_> {
    fn fulfil(mut self, lease: FloatingLease) {
        if let Some(key) = self.key.take() {
            lock(self.slots).insert(key, Slot::Held(lease));
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(self.slots).remove(&key);
        }
    }
}

fn lock(slots: &Mutex<HashMap<Key, Slot>>) -> MutexGuard<'_, HashMap<Key, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(holder: &str, product: &str) -> Key {
    (holder.to_string(), product.to_string())
}

impl FloatingLeaseManager {
    #[must_use]
    pub fn new(transport: Arc<dyn LeaseTransport>, config: LeaseConfig) -> Self {
        Self {
            transport,
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// A manager backed by a fresh in-process pool.
    #[must_use]
    pub fn local(config: LeaseConfig) -> Self {
        let pool = LocalPool::new(&config);
        Self::new(Arc::new(pool), config)
    }

    #[must_use]
    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Whether `holder` currently holds a lease for `product`.
    #[must_use]
    pub fn holds(&self, holder: &str, product: &str) -> bool {
        matches!(
            lock(&self.slots).get(&key(holder, product)),
            Some(Slot::Held(_))
        )
    }

    /// The lease `holder` holds for `product`, if any.
    #[must_use]
    pub fn lease(&self, holder: &str, product: &str) -> Option<FloatingLease> {
        match lock(&self.slots).get(&key(holder, product)) {
            Some(Slot::Held(lease)) => Some(lease.clone()),
            _ => None,
        }
    }

    /// Acquires a slot of `product` for `holder`.
    ///
    /// Waits at most `acquire_timeout` for a free slot. Dropping the returned
    /// future before it resolves leaves no slot granted and no pending state.
    ///
    /// # Errors
    ///
    /// `AlreadyLeased` if the pair already holds (or is acquiring) a lease,
    /// `CapacityExceeded` if no slot frees up in time, or `Transport`.
    pub async fn acquire(&self, holder: &str, product: &str) -> LeaseResult<FloatingLease> {
        let key = key(holder, product);
        {
            let mut slots = lock(&self.slots);
            if slots.contains_key(&key) {
                return Err(LeaseError::already_leased(holder, product));
            }
            slots.insert(key.clone(), Slot::Pending);
        }
        let reservation = Reservation {
            slots: &self.slots,
            key: Some(key),
        };

        let lease = match self
            .transport
            .acquire_slot(holder, product, self.config.acquire_timeout)
            .await
        {
            Ok(lease) => lease,
            Err(e) => {
                warn!(holder, product, error = %e, "lease acquire failed");
                return Err(e);
            }
        };
        reservation.fulfil(lease.clone());
        info!(%lease, "lease acquired");
        Ok(lease)
    }

    /// Releases the lease `holder` holds for `product`.
    ///
    /// The local record is cleared even if the transport reports an error.
    ///
    /// # Errors
    ///
    /// `NotLeased` if the pair holds no lease, or the transport's error.
    pub async fn release(&self, holder: &str, product: &str) -> LeaseResult<()> {
        let lease = {
            let mut slots = lock(&self.slots);
            let key = key(holder, product);
            match slots.get(&key) {
                Some(Slot::Held(_)) => match slots.remove(&key) {
                    Some(Slot::Held(lease)) => lease,
                    _ => return Err(LeaseError::not_leased(holder, product)),
                },
                _ => return Err(LeaseError::not_leased(holder, product)),
            }
        };

        self.transport.release_slot(&lease).await?;
        info!(%lease, "lease released");
        Ok(())
    }

    /// Extends the lease `holder` holds for `product`.
    ///
    /// # Errors
    ///
    /// `NotLeased` if the pair holds no lease or the authority already
    /// reclaimed it; the local record is dropped in the latter case.
    pub async fn renew(&self, holder: &str, product: &str) -> LeaseResult<FloatingLease> {
        let Some(lease) = self.lease(holder, product) else {
            return Err(LeaseError::not_leased(holder, product));
        };

        match self.transport.renew_slot(&lease).await {
            Ok(renewed) => {
                let mut slots = lock(&self.slots);
                if let Some(Slot::Held(held)) = slots.get_mut(&key(holder, product)) {
                    *held = renewed.clone();
                }
                Ok(renewed)
            }
            Err(e @ LeaseError::NotLeased { .. }) => {
                warn!(%lease, "lease was reclaimed by the authority");
                let key = key(holder, product);
                let mut slots = lock(&self.slots);
                if matches!(slots.get(&key), Some(Slot::Held(held)) if held.id == lease.id) {
                    slots.remove(&key);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FloatingLeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatingLeaseManager")
            .field("config", &self.config)
            .field("slots", &lock(&self.slots).len())
            .finish_non_exhaustive()
    }
}
