//! The validation context: a read-only snapshot of host facts.
//!
//! Every fact a restriction may need is collected up front, so validation
//! itself never performs I/O and its latency does not depend on the host.

use crate::device::SystemInformation;
use crate::error::LicenseResult;
use crate::usage::{UsageSnapshot, UsageStore};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Host facts restrictions are evaluated against.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidationContext {
    total_physical_memory: u64,
    hardware_key: String,
    domain: Option<String>,
    running_instances: u32,
    usage: UsageSnapshot,
    now: DateTime<Utc>,
}

impl ValidationContext {
    /// Collects a fresh context for `product` from the given providers.
    ///
    /// This records one run of `product` in the usage store; the returned
    /// context reflects the counters after that run.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage store cannot be read or updated.
    pub fn collect(
        product: &str,
        system: &dyn SystemInformation,
        clock: &dyn Clock,
        usage: &dyn UsageStore,
    ) -> LicenseResult<Self> {
        let now = clock.now();
        let usage = usage.record_run(product, now)?;
        let ctx = Self {
            total_physical_memory: system.total_physical_memory(),
            hardware_key: system.hardware_key(),
            domain: system.domain(),
            running_instances: system.running_instances(product),
            usage,
            now,
        };
        debug!(product, ?ctx, "collected validation context");
        Ok(ctx)
    }

    /// Starts a context from explicit facts.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Total physical memory in bytes.
    #[must_use]
    pub fn total_physical_memory(&self) -> u64 {
        self.total_physical_memory
    }

    #[must_use]
    pub fn hardware_key(&self) -> &str {
        &self.hardware_key
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Number of recorded runs, including the current one.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.usage.run_count
    }

    /// Instances of the product currently running on this host.
    #[must_use]
    pub fn running_instances(&self) -> u32 {
        self.running_instances
    }

    /// Metered usage units consumed so far.
    #[must_use]
    pub fn usage_count(&self) -> u64 {
        self.usage.usage_count
    }

    #[must_use]
    pub fn first_run(&self) -> DateTime<Utc> {
        self.usage.first_run.unwrap_or(self.now)
    }

    #[must_use]
    pub fn elapsed_since_first_run(&self) -> Duration {
        (self.now - self.first_run()).max(Duration::zero())
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("memory_mb", &(self.total_physical_memory / 1024 / 1024))
            .field("domain", &self.domain)
            .field("running_instances", &self.running_instances)
            .field("run_count", &self.usage.run_count)
            .field("usage_count", &self.usage.usage_count)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`ValidationContext`] with explicitly supplied facts.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    total_physical_memory: u64,
    hardware_key: String,
    domain: Option<String>,
    running_instances: u32,
    usage: UsageSnapshot,
    now: Option<DateTime<Utc>>,
}

impl ContextBuilder {
    #[must_use]
    pub fn total_physical_memory(mut self, bytes: u64) -> Self {
        self.total_physical_memory = bytes;
        self
    }

    #[must_use]
    pub fn memory_megabytes(self, mb: u64) -> Self {
        self.total_physical_memory(mb * 1024 * 1024)
    }

    #[must_use]
    pub fn hardware_key(mut self, key: impl Into<String>) -> Self {
        self.hardware_key = key.into();
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn running_instances(mut self, n: u32) -> Self {
        self.running_instances = n;
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: UsageSnapshot) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub fn build(self) -> ValidationContext {
        ValidationContext {
            total_physical_memory: self.total_physical_memory,
            hardware_key: self.hardware_key,
            domain: self.domain,
            running_instances: self.running_instances,
            usage: self.usage,
            now: self.now.unwrap_or_else(Utc::now),
        }
    }
}
