//! Lease identity and state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one granted lease. Time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaseId(Uuid);

impl LeaseId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One held slot of a product's floating pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingLease {
    pub id: LeaseId,
    pub product: String,
    /// User key or machine identity the slot is held for.
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    /// When the authority will reclaim the slot unless it is renewed.
    pub expires_at: Option<DateTime<Utc>>,
}

impl FloatingLease {
    #[must_use]
    pub fn new(holder: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            id: LeaseId::new(),
            product: product.into(),
            holder: holder.into(),
            acquired_at: Utc::now(),
            expires_at: None,
        }
    }
}

impl fmt::Display for FloatingLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} on {})", self.id, self.holder, self.product)
    }
}
