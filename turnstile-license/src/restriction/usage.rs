//! Metered usage restriction.

use super::{Property, Rule, Subject, Verdict, parse_arg};
use crate::context::ValidationContext;
use crate::error::LicenseResult;

/// Caps the number of metered usage units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsageRestriction {
    /// Allowed usage units; zero means unmetered.
    pub usage: u64,
}

impl UsageRestriction {
    #[must_use]
    pub fn new(usage: u64) -> Self {
        Self { usage }
    }

    /// Units left before the cap, or `None` when unmetered.
    #[must_use]
    pub fn remaining(&self, ctx: &ValidationContext) -> Option<u64> {
        (self.usage > 0).then(|| self.usage.saturating_sub(ctx.usage_count()))
    }
}

impl Rule for UsageRestriction {
    const KIND: &'static str = "Usage";

    fn validate(&self, ctx: &ValidationContext, _subject: &Subject) -> Verdict {
        if self.usage > 0 && ctx.usage_count() > self.usage {
            return Verdict::Reject;
        }
        Verdict::Accept
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new("Usage", self.usage)]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        if let Some(usage) = parse_arg(Self::KIND, args, 0)? {
            self.usage = usage;
        }
        Ok(())
    }
}
