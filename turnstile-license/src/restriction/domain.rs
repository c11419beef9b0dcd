//! Network domain restriction.

use super::{Property, Rule, Subject, Verdict};
use crate::context::ValidationContext;
use crate::error::LicenseResult;

/// Limits a license to hosts inside a DNS domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DomainRestriction {
    /// Allowed domain; subdomains match. Empty means any domain.
    pub domain: String,
}

impl DomainRestriction {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    fn matches(&self, host_domain: &str) -> bool {
        let allowed = self.domain.trim_end_matches('.').to_ascii_lowercase();
        let host = host_domain.trim_end_matches('.').to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    }
}

impl Rule for DomainRestriction {
    const KIND: &'static str = "Domain";

    fn validate(&self, ctx: &ValidationContext, _subject: &Subject) -> Verdict {
        if self.domain.is_empty() {
            return Verdict::Accept;
        }
        match ctx.domain() {
            Some(host) if self.matches(host) => Verdict::Accept,
            _ => Verdict::Reject,
        }
    }

    fn properties(&self) -> Vec<Property> {
        vec![Property::new("Domain", &self.domain)]
    }

    fn apply_args(&mut self, args: &[&str]) -> LicenseResult<()> {
        if let Some(domain) = args.first() {
            self.domain = domain.trim().to_string();
        }
        Ok(())
    }
}
