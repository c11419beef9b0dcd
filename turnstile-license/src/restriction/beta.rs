//! Build-channel restriction.

use super::{Property, Rule, Subject, Verdict};
use crate::context::ValidationContext;
use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Release channel of a product build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BuildType {
    /// Matches every build. Only meaningful on a restriction.
    #[default]
    Any = 0,
    Release = 1,
    Beta = 2,
    Debug = 3,
}

impl BuildType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Release => "Release",
            Self::Beta => "Beta",
            Self::Debug => "Debug",
        }
    }

    pub(crate) fn from_u8(value: u8) -> LicenseResult<Self> {
        match value {
            0 => Ok(Self::Any),
            1 => Ok(Self::Release),
            2 => Ok(Self::Beta),
            3 => Ok(Self::Debug),
            other => Err(LicenseError::malformed(format!("unknown build type {other}"))),
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "release" => Ok(Self::Release),
            "beta" => Ok(Self::Beta),
            "debug" => Ok(Self::Debug),
            _ => Err(LicenseError::malformed(format!("unknown build type {s:?}"))),
        }
    }
}

/// Limits a license to one build channel (e.g. beta-only keys).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BetaRestriction {
    pub build_type: BuildType,
}

impl BetaRestriction {
    #[must_use]
    pub fn new(build_type: BuildType) -> Self {
        Self { build_type }
    }
}

impl Rule for BetaRestriction {
    const KIND: &'static str = "Beta";

    fn validate(&self, _ctx: &ValidationContext, subject: &Subject) -> Verdict {
        if self.build_type != BuildType::Any && subject.build != self.build_type {
            return Verdict::Reject;
        }
        Verdict::Accept
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new("BuildType", self.build_type)]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        if let Some(raw) = args.first() {
            self.build_type = raw.parse()?;
        }
        Ok(())
    }
}
