//! Hardware-bound restriction.

use super::{Property, Rule, Subject, Verdict};
use crate::context::ValidationContext;
use crate::error::LicenseResult;

/// Binds a license to one machine's hardware key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HardwareRestriction {
    /// Expected hardware key; empty means any machine.
    pub hardware_key: String,
}

impl HardwareRestriction {
    #[must_use]
    pub fn new(hardware_key: impl Into<String>) -> Self {
        Self {
            hardware_key: hardware_key.into(),
        }
    }
}

impl Rule for HardwareRestriction {
    const KIND: &'static str = "Hardware";

    fn validate(&self, ctx: &ValidationContext, _subject: &Subject) -> Verdict {
        if !self.hardware_key.is_empty()
            && !self.hardware_key.eq_ignore_ascii_case(ctx.hardware_key())
        {
            return Verdict::Reject;
        }
        Verdict::Accept
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new("HardwareKey", &self.hardware_key)]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        // Hardware keys may themselves contain ':' so the remainder is rejoined.
        if !args.is_empty() {
            self.hardware_key = args.join(":");
        }
        Ok(())
    }
}
