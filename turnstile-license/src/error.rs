//! Error types for the licensing module.

use thiserror::Error;

/// Licensing-specific errors.
///
/// A restriction rejecting a license is not represented here: that outcome is
/// carried as data in [`crate::ValidationOutcome`].
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The registry has no constructor for the requested restriction kind.
    #[error("unsupported restriction kind: {0}")]
    UnsupportedRestrictionKind(String),

    /// Structured or binary input could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Invalid signed license format.
    #[error("invalid license key format: {0}")]
    InvalidKeyFormat(String),

    /// Ed25519 signature verification failed.
    #[error("license signature invalid")]
    InvalidSignature,

    /// Signed payload is not a readable license document.
    #[error("invalid license payload: {0}")]
    InvalidPayload(String),

    /// Usage store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }
}

impl From<quick_xml::Error> for LicenseError {
    fn from(e: quick_xml::Error) -> Self {
        Self::MalformedEncoding(format!("markup: {e}"))
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
