//! Restriction kinds and their validation rules.
//!
//! A restriction is a named eligibility rule attached to a license. Each kind
//! is a plain value type implementing [`Rule`]; [`Restriction`] is the tagged
//! union the rest of the crate works with. Adding a kind means writing the
//! type, its wire state in [`crate::codec`], and one line in the variant list
//! below. The validator never changes.

mod beta;
mod domain;
mod hardware;
mod memory;
mod trial;
mod usage;

pub use beta::{BetaRestriction, BuildType};
pub use domain::DomainRestriction;
pub use hardware::HardwareRestriction;
pub use memory::MemoryRestriction;
pub use trial::TrialRestriction;
pub use usage::UsageRestriction;

use crate::codec::WireState;
use crate::context::ValidationContext;
use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of evaluating a single restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    #[must_use]
    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }

    #[must_use]
    pub fn is_reject(self) -> bool {
        self == Self::Reject
    }
}

/// The product build a license is being validated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub product: String,
    pub version: String,
    pub build: BuildType,
}

impl Subject {
    #[must_use]
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: String::new(),
            build: BuildType::Release,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_build(mut self, build: BuildType) -> Self {
        self.build = build;
        self
    }
}

/// A named piece of restriction state, for audit and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: &'static str,
    pub value: String,
}

impl Property {
    pub(crate) fn new(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Validation logic of one restriction kind.
pub trait Rule: Default + Into<Restriction> {
    /// Type token the registry and the markup element use for this kind.
    const KIND: &'static str;

    /// Evaluates the rule. Must not have side effects.
    fn validate(&self, ctx: &ValidationContext, subject: &Subject) -> Verdict;

    /// Current state as name/value pairs.
    fn properties(&self) -> Vec<Property>;

    /// Applies positional registry arguments (`Kind:arg1:arg2`).
    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()>;
}

/// Parses the positional argument at `index`, if present.
pub(crate) fn parse_arg<T: FromStr>(
    kind: &str,
    args: &[&str],
    index: usize,
) -> LicenseResult<Option<T>> {
    match args.get(index) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            LicenseError::malformed(format!("{kind}: argument {} is not valid: {raw:?}", index + 1))
        }),
    }
}

/// Constructor the registry stores per kind.
pub type Constructor = fn(&[&str]) -> LicenseResult<Restriction>;

pub(crate) fn construct<R: Rule>(args: &[&str]) -> LicenseResult<Restriction> {
    let mut rule = R::default();
    rule.apply_args(args)?;
    Ok(rule.into())
}

macro_rules! restriction_variants {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        /// A restriction of any built-in kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Restriction {
            $($variant($ty)),+
        }

        impl Restriction {
            /// Type token of this restriction.
            #[must_use]
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$ty as Rule>::KIND),+
                }
            }

            /// Evaluates this restriction against `ctx`.
            #[must_use]
            pub fn validate(&self, ctx: &ValidationContext, subject: &Subject) -> Verdict {
                match self {
                    $(Self::$variant(r) => r.validate(ctx, subject)),+
                }
            }

            /// State of this restriction; cheap and repeatable.
            #[must_use]
            pub fn properties(&self) -> Vec<Property> {
                match self {
                    $(Self::$variant(r) => r.properties()),+
                }
            }

            pub(crate) fn wire_state(&self) -> &dyn WireState {
                match self {
                    $(Self::$variant(r) => r as &dyn WireState),+
                }
            }

            pub(crate) fn wire_state_mut(&mut self) -> &mut dyn WireState {
                match self {
                    $(Self::$variant(r) => r as &mut dyn WireState),+
                }
            }

            /// Every built-in kind with its constructor.
            #[must_use]
            pub fn builtin_kinds() -> Vec<(&'static str, Constructor)> {
                vec![$((<$ty as Rule>::KIND, construct::<$ty> as Constructor)),+]
            }
        }

        $(
            impl From<$ty> for Restriction {
                fn from(r: $ty) -> Self {
                    Self::$variant(r)
                }
            }
        )+
    };
}

restriction_variants! {
    Memory(MemoryRestriction),
    Trial(TrialRestriction),
    Hardware(HardwareRestriction),
    Beta(BetaRestriction),
    Domain(DomainRestriction),
    Usage(UsageRestriction),
}

impl Restriction {
    /// Display name; identical to the kind token.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind()
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        let props = self.properties();
        if !props.is_empty() {
            let rendered: Vec<String> = props.iter().map(ToString::to_string).collect();
            write!(f, " ({})", rendered.join(", "))?;
        }
        Ok(())
    }
}
