//! Trial restriction: expiry window, run cap and concurrent instance cap.

use super::{Property, Rule, Subject, Verdict, parse_arg};
use crate::context::ValidationContext;
use crate::error::LicenseResult;
use chrono::Duration;

/// A time-boxed evaluation license.
///
/// Each limit is independent and zero disables it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TrialRestriction {
    /// Days after the first run during which the product may run.
    pub expire_days: u32,
    /// Maximum number of runs.
    pub run_count: u32,
    /// Maximum number of simultaneously running instances.
    pub run_instances: u32,
}

impl TrialRestriction {
    #[must_use]
    pub fn new(expire_days: u32) -> Self {
        Self {
            expire_days,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_run_count(mut self, run_count: u32) -> Self {
        self.run_count = run_count;
        self
    }

    #[must_use]
    pub fn with_run_instances(mut self, run_instances: u32) -> Self {
        self.run_instances = run_instances;
        self
    }

    /// Time left in the trial window, or `None` if it never expires.
    #[must_use]
    pub fn time_left(&self, ctx: &ValidationContext) -> Option<Duration> {
        if self.expire_days == 0 {
            return None;
        }
        let window = Duration::days(i64::from(self.expire_days));
        Some((window - ctx.elapsed_since_first_run()).max(Duration::zero()))
    }

    /// Runs left before the cap, or `None` when uncapped.
    #[must_use]
    pub fn runs_left(&self, ctx: &ValidationContext) -> Option<u64> {
        (self.run_count > 0).then(|| u64::from(self.run_count).saturating_sub(ctx.run_count()))
    }
}

impl Rule for TrialRestriction {
    const KIND: &'static str = "Trial";

    fn validate(&self, ctx: &ValidationContext, _subject: &Subject) -> Verdict {
        if self.time_left(ctx).is_some_and(|left| left <= Duration::zero()) {
            return Verdict::Reject;
        }
        if self.run_count > 0 && ctx.run_count() > u64::from(self.run_count) {
            return Verdict::Reject;
        }
        if self.run_instances > 0 && ctx.running_instances() > self.run_instances {
            return Verdict::Reject;
        }
        Verdict::Accept
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new("ExpireDays", self.expire_days),
            Property::new("RunCount", self.run_count),
            Property::new("RunInstances", self.run_instances),
        ]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        if let Some(days) = parse_arg(Self::KIND, args, 0)? {
            self.expire_days = days;
        }
        if let Some(runs) = parse_arg(Self::KIND, args, 1)? {
            self.run_count = runs;
        }
        if let Some(instances) = parse_arg(Self::KIND, args, 2)? {
            self.run_instances = instances;
        }
        Ok(())
    }
}
