//! Lease configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for a lease manager and its in-process pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// Concurrent leases allowed per product.
    pub capacity: u32,
    /// How long `acquire` waits for a free slot.
    #[serde(rename = "acquire_timeout_secs", with = "secs")]
    pub acquire_timeout: Duration,
    /// Lifetime of a grant before it is reclaimed; `None` never expires.
    #[serde(rename = "lease_ttl_secs", with = "opt_secs")]
    pub lease_ttl: Option<Duration>,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            acquire_timeout: Duration::from_secs(30),
            lease_ttl: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl LeaseConfig {
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_lease_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.lease_ttl = ttl;
        self
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|o| o.map(Duration::from_secs))
    }
}
