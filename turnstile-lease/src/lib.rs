//! Floating license leases for Turnstile.
//!
//! A floating license lets a bounded number of holders run a product at the
//! same time. [`FloatingLeaseManager`] hands out those slots through a
//! [`LeaseTransport`]; [`LocalPool`] enforces capacity in-process.
//!
//! Every successful acquire must be matched by exactly one release. Use
//! [`FloatingLeaseManager::with_lease`] or a [`LeaseGuard`] so that holds on
//! error and cancellation paths too.
//!
//! ```no_run
//! # async fn demo() -> turnstile_lease::LeaseResult<()> {
//! use std::sync::Arc;
//! use turnstile_lease::{FloatingLeaseManager, LeaseConfig};
//!
//! let manager = Arc::new(FloatingLeaseManager::local(LeaseConfig::default().with_capacity(5)));
//! let answer = manager
//!     .with_lease("user1", "ProductX", |_lease| async { 42 })
//!     .await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod guard;
mod lease;
mod manager;
mod pool;
mod transport;

pub use config::LeaseConfig;
pub use error::{LeaseError, LeaseResult};
pub use guard::LeaseGuard;
pub use lease::{FloatingLease, LeaseId};
pub use manager::FloatingLeaseManager;
pub use pool::LocalPool;
pub use transport::LeaseTransport;
