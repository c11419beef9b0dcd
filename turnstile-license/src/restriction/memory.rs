//! Minimum physical memory restriction.

use super::{Property, Rule, Subject, Verdict, parse_arg};
use crate::context::ValidationContext;
use crate::error::LicenseResult;

/// Rejects hosts with less physical memory than required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MemoryRestriction {
    /// Required total physical memory in megabytes; zero means no minimum.
    pub total_memory: u64,
}

impl MemoryRestriction {
    #[must_use]
    pub fn new(total_memory: u64) -> Self {
        Self { total_memory }
    }
}

fn to_megabytes(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

impl Rule for MemoryRestriction {
    const KIND: &'static str = "Memory";

    fn validate(&self, ctx: &ValidationContext, _subject: &Subject) -> Verdict {
        if to_megabytes(ctx.total_physical_memory()) < self.total_memory {
            return Verdict::Reject;
        }
        Verdict::Accept
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new("TotalMemory", self.total_memory)]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        if let Some(mb) = parse_arg(Self::KIND, args, 0)? {
            self.total_memory = mb;
        }
        Ok(())
    }
}
