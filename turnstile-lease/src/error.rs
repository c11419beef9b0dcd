//! Error types for lease operations.

use thiserror::Error;

/// Result type for lease operations.
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Errors that can occur while acquiring, renewing or releasing a lease.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaseError {
    /// No slot became free within the acquire timeout.
    #[error("no free lease for {product} (capacity {capacity})")]
    CapacityExceeded { product: String, capacity: u32 },

    /// The holder already has a lease for this product.
    #[error("{holder} already holds a lease for {product}")]
    AlreadyLeased { holder: String, product: String },

    /// The holder has no lease for this product.
    #[error("{holder} holds no lease for {product}")]
    NotLeased { holder: String, product: String },

    /// The lease authority could not be reached or answered badly.
    #[error("lease transport error: {0}")]
    Transport(String),
}

impl LeaseError {
    pub(crate) fn already_leased(holder: &str, product: &str) -> Self {
        Self::AlreadyLeased {
            holder: holder.to_string(),
            product: product.to_string(),
        }
    }

    pub(crate) fn not_leased(holder: &str, product: &str) -> Self {
        Self::NotLeased {
            holder: holder.to_string(),
            product: product.to_string(),
        }
    }
}
