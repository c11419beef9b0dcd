//! License validation for Turnstile.
//!
//! This crate handles:
//! - The license model: features, fields and restrictions
//! - Restriction kinds (memory, trial, hardware, beta, domain, usage)
//! - Markup and binary encodings of restrictions and licenses
//! - A registry mapping restriction type tokens to instances
//! - Collecting host facts into a validation context
//! - Counting running instances of a product on this host
//! - Evaluating every restriction of a license against that context
//! - Ed25519 verification of signed license envelopes
//!
//! # Design Principles
//!
//! - **Rejection is data**: a failed restriction yields an invalid outcome,
//!   not an error
//! - **No I/O during validation**: host facts are collected up front
//! - **Partial registries**: a product only registers the kinds it uses
//!
//! # Example
//!
//! ```
//! use turnstile_license::{
//!     License, LicenseId, LicenseValidator, MemoryRestriction, Subject, ValidationContext,
//! };
//!
//! let license = License::builder(LicenseId::new())
//!     .restriction(MemoryRestriction::new(4096))
//!     .build()
//!     .unwrap();
//! let ctx = ValidationContext::builder().memory_megabytes(8192).build();
//!
//! let outcome = LicenseValidator::new().validate(&license, &ctx, &Subject::new("ProductX"));
//! assert!(outcome.is_valid());
//! ```

pub mod codec;
mod context;
mod device;
mod error;
mod instances;
mod license;
mod registry;
mod report;
pub mod restriction;
mod source;
mod usage;
mod validator;

pub use codec::{Format, MarkupAttributes, RestrictionCodec};
pub use context::{Clock, ContextBuilder, FixedClock, SystemClock, ValidationContext};
pub use device::{HostSystem, StaticSystem, SystemInformation};
pub use error::{LicenseError, LicenseResult};
pub use instances::{InstanceGuard, InstanceRegistry};
pub use license::{Feature, Field, FieldValue, License, LicenseBuilder, LicenseId};
pub use registry::{LicenseFactory, RestrictionRegistry};
pub use report::{AccessCount, AccessKind, ReportSink, TrackedLicense, UsageReport, UsageTracker};
pub use restriction::{
    BetaRestriction, BuildType, DomainRestriction, HardwareRestriction, MemoryRestriction,
    Property, Restriction, Rule, Subject, TrialRestriction, UsageRestriction, Verdict,
};
pub use source::{FileLicenseSource, LicenseSource, SignedLicense};
pub use usage::{FileUsageStore, MemoryUsageStore, UsageSnapshot, UsageStore};
pub use validator::{LicenseValidator, RestrictionEvaluation, ValidationOutcome, ValidationState};

use std::sync::Arc;

/// A codec backed by the standard registry.
#[must_use]
pub fn standard_codec() -> RestrictionCodec {
    RestrictionCodec::new(Arc::new(RestrictionRegistry::standard()))
}
