//! The license factory: maps restriction type tokens to instances.
//!
//! Tokens are `Kind` or `Kind:arg1[:arg2...]`. A registry only knows the
//! kinds registered with it; a product that uses two restriction kinds can
//! ship a registry with just those two.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{Feature, Field};
use crate::restriction::{Constructor, Restriction, Rule, construct};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Creates license parts from their names and type tokens.
pub trait LicenseFactory: Send + Sync {
    fn create_feature(&self, name: &str) -> Feature {
        Feature::new(name)
    }

    fn create_field(&self, name: &str) -> Field {
        Field::new(name)
    }

    /// Creates a restriction from a type token.
    ///
    /// Returns `Ok(None)` when the kind is not supported by this factory.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEncoding` if the kind is known but its arguments
    /// cannot be parsed.
    fn create_restriction(&self, token: &str) -> LicenseResult<Option<Restriction>>;

    /// Like [`create_restriction`](Self::create_restriction), but an
    /// unsupported kind is an `UnsupportedRestrictionKind` error.
    fn require_restriction(&self, token: &str) -> LicenseResult<Restriction> {
        self.create_restriction(token)?
            .ok_or_else(|| LicenseError::UnsupportedRestrictionKind(kind_of(token).to_string()))
    }
}

fn kind_of(token: &str) -> &str {
    token.split(':').next().unwrap_or_default().trim()
}

/// A [`LicenseFactory`] backed by a table of constructors.
#[derive(Clone, Default)]
pub struct RestrictionRegistry {
    constructors: HashMap<String, Constructor>,
}

impl RestrictionRegistry {
    /// A registry that knows no restriction kinds.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in restriction kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for (kind, ctor) in Restriction::builtin_kinds() {
            registry.register(kind, ctor);
        }
        registry
    }

    /// Registers (or replaces) the constructor for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, ctor: Constructor) -> &mut Self {
        self.constructors.insert(kind.into(), ctor);
        self
    }

    /// Registers the built-in constructor for rule type `R`.
    pub fn register_rule<R: Rule>(&mut self) -> &mut Self {
        self.register(R::KIND, construct::<R>)
    }

    #[must_use]
    pub fn supports(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for RestrictionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestrictionRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl LicenseFactory for RestrictionRegistry {
    fn create_restriction(&self, token: &str) -> LicenseResult<Option<Restriction>> {
        let mut parts = token.split(':');
        let kind = parts.next().unwrap_or_default().trim();
        let args: Vec<&str> = parts.collect();

        let Some(ctor) = self.constructors.get(kind) else {
            debug!(kind, "restriction kind not registered");
            return Ok(None);
        };
        ctor(&args).map(Some)
    }
}
