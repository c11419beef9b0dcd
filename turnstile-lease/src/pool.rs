//! In-process capacity pool.
//!
//! Each product gets a counting semaphore with one permit per slot. A grant
//! owns its permit, so removing the grant is what frees the slot. Grants older
//! than the lease TTL are reclaimed before every capacity check and, while an
//! acquire waits, as soon as the next one falls due. A holder that crashed
//! without releasing cannot starve the pool for longer than one TTL.

use crate::config::LeaseConfig;
use crate::error::{LeaseError, LeaseResult};
use crate::lease::{FloatingLease, LeaseId};
use crate::transport::LeaseTransport;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

struct Grant {
    lease: FloatingLease,
    deadline: Option<Instant>,
    _permit: OwnedSemaphorePermit,
}

impl Grant {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|d| d > now)
    }
}

struct ProductPool {
    capacity: u32,
    semaphore: Arc<Semaphore>,
    grants: Mutex<HashMap<LeaseId, Grant>>,
}

impl ProductPool {
    fn new(capacity: u32) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            grants: Mutex::new(HashMap::new()),
        }
    }

    fn grants(&self) -> MutexGuard<'_, HashMap<LeaseId, Grant>> {
        self.grants.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops expired grants, freeing their permits. Returns how many.
    fn reclaim_expired(&self) -> usize {
        let now = Instant::now();
        let mut grants = self.grants();
        let before = grants.len();
        grants.retain(|_, grant| {
            let live = grant.is_live(now);
            if !live {
                warn!(lease = %grant.lease, "reclaimed expired lease");
            }
            live
        });
        before - grants.len()
    }

    /// Earliest deadline among the current grants.
    fn next_deadline(&self) -> Option<Instant> {
        self.grants().values().filter_map(|g| g.deadline).min()
    }

    fn capacity_exceeded(&self, product: &str) -> LeaseError {
        LeaseError::CapacityExceeded {
            product: product.to_string(),
            capacity: self.capacity,
        }
    }
}

/// A [`LeaseTransport`] that enforces capacity inside this process.
pub struct LocalPool {
    default_capacity: u32,
    lease_ttl: Option<Duration>,
    products: Mutex<HashMap<String, Arc<ProductPool>>>,
}

impl LocalPool {
    /// A pool giving every product `config.capacity` slots.
    #[must_use]
    pub fn new(config: &LeaseConfig) -> Self {
        Self {
            default_capacity: config.capacity,
            lease_ttl: config.lease_ttl,
            products: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the capacity of one product.
    #[must_use]
    pub fn with_product_capacity(mut self, product: impl Into<String>, capacity: u32) -> Self {
        self.products
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.into(), Arc::new(ProductPool::new(capacity)));
        self
    }

    fn product(&self, product: &str) -> Arc<ProductPool> {
        let mut products = self.products.lock().unwrap_or_else(PoisonError::into_inner);
        products
            .entry(product.to_string())
            .or_insert_with(|| Arc::new(ProductPool::new(self.default_capacity)))
            .clone()
    }

    /// Free slots of `product`, not counting expired grants not yet reclaimed.
    #[must_use]
    pub fn available(&self, product: &str) -> usize {
        self.product(product).semaphore.available_permits()
    }

    /// Holders with a grant for `product`, sorted.
    #[must_use]
    pub fn holders(&self, product: &str) -> Vec<String> {
        let pool = self.product(product);
        let mut holders: Vec<String> = pool
            .grants()
            .values()
            .map(|g| g.lease.holder.clone())
            .collect();
        holders.sort();
        holders
    }

    fn expiry(&self) -> (Option<Instant>, Option<chrono::DateTime<Utc>>) {
        match self.lease_ttl {
            None => (None, None),
            Some(ttl) => (
                Some(Instant::now() + ttl),
                TimeDelta::from_std(ttl).ok().map(|d| Utc::now() + d),
            ),
        }
    }
}

#[async_trait]
impl LeaseTransport for LocalPool {
    async fn acquire_slot(
        &self,
        holder: &str,
        product: &str,
        wait: Duration,
    ) -> LeaseResult<FloatingLease> {
        let pool = self.product(product);
        pool.reclaim_expired();
        if pool.grants().values().any(|g| g.lease.holder == holder) {
            return Err(LeaseError::already_leased(holder, product));
        }

        let give_up = Instant::now() + wait;
        let permit = loop {
            let until = pool.next_deadline().map_or(give_up, |d| d.min(give_up));
            match timeout_at(until, pool.semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => break permit,
                Ok(Err(_)) => {
                    return Err(LeaseError::Transport(format!("pool for {product} is closed")));
                }
                Err(_) => {
                    pool.reclaim_expired();
                    if let Ok(permit) = pool.semaphore.clone().try_acquire_owned() {
                        break permit;
                    }
                    if Instant::now() >= give_up {
                        return Err(pool.capacity_exceeded(product));
                    }
                }
            }
        };

        let mut grants = pool.grants();
        // Another caller may have granted this holder while we waited.
        if grants.values().any(|g| g.lease.holder == holder) {
            return Err(LeaseError::already_leased(holder, product));
        }
        let (deadline, expires_at) = self.expiry();
        let mut lease = FloatingLease::new(holder, product);
        lease.expires_at = expires_at;
        grants.insert(
            lease.id,
            Grant {
                lease: lease.clone(),
                deadline,
                _permit: permit,
            },
        );
        debug!(%lease, free = pool.semaphore.available_permits(), "slot granted");
        Ok(lease)
    }

    async fn release_slot(&self, lease: &FloatingLease) -> LeaseResult<()> {
        let pool = self.product(&lease.product);
        let mut grants = pool.grants();
        match grants.get(&lease.id) {
            Some(grant) if grant.lease.holder == lease.holder => {
                grants.remove(&lease.id);
                debug!(%lease, "slot returned");
                Ok(())
            }
            _ => Err(LeaseError::not_leased(&lease.holder, &lease.product)),
        }
    }

    async fn renew_slot(&self, lease: &FloatingLease) -> LeaseResult<FloatingLease> {
        let pool = self.product(&lease.product);
        let (deadline, expires_at) = self.expiry();
        let mut grants = pool.grants();
        let Some(grant) = grants
            .get_mut(&lease.id)
            .filter(|g| g.lease.holder == lease.holder)
        else {
            return Err(LeaseError::not_leased(&lease.holder, &lease.product));
        };
        if !grant.is_live(Instant::now()) {
            warn!(%lease, "reclaimed expired lease on renew");
            grants.remove(&lease.id);
            return Err(LeaseError::not_leased(&lease.holder, &lease.product));
        }
        grant.deadline = deadline;
        grant.lease.expires_at = expires_at;
        Ok(grant.lease.clone())
    }
}
