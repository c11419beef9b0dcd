//! Evaluates a license's restrictions against a validation context.
//!
//! Every restriction is evaluated exactly once, in the license's stored
//! order, whatever the earlier results were. A rejection is reported in the
//! returned [`ValidationOutcome`], never as an error.

use crate::context::ValidationContext;
use crate::license::{License, LicenseId};
use crate::restriction::{Subject, Verdict};
use serde::Serialize;
use tracing::{debug, info};

/// Result of evaluating one restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestrictionEvaluation {
    /// Position in the license's restriction list.
    pub index: usize,
    pub name: &'static str,
    pub verdict: Verdict,
}

/// Terminal state of a validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ValidationState {
    Valid,
    Invalid {
        /// First restriction that rejected.
        restriction: &'static str,
    },
}

/// Verdict for a whole license plus the per-restriction trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub license_id: LicenseId,
    pub state: ValidationState,
    pub evaluations: Vec<RestrictionEvaluation>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state == ValidationState::Valid
    }

    /// Name of the first rejecting restriction, if any.
    #[must_use]
    pub fn rejected_by(&self) -> Option<&'static str> {
        match self.state {
            ValidationState::Valid => None,
            ValidationState::Invalid { restriction } => Some(restriction),
        }
    }

    /// Names of every rejecting restriction, in evaluation order.
    #[must_use]
    pub fn rejections(&self) -> Vec<&'static str> {
        self.evaluations
            .iter()
            .filter(|e| e.verdict.is_reject())
            .map(|e| e.name)
            .collect()
    }
}

/// Stateless restriction evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseValidator;

impl LicenseValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates `license` for `subject` against `ctx`.
    #[must_use]
    pub fn validate(
        &self,
        license: &License,
        ctx: &ValidationContext,
        subject: &Subject,
    ) -> ValidationOutcome {
        let mut evaluations = Vec::with_capacity(license.restrictions().len());
        let mut first_reject = None;

        for (index, restriction) in license.restrictions().iter().enumerate() {
            let verdict = restriction.validate(ctx, subject);
            debug!(
                license = %license.id(),
                index,
                restriction = %restriction,
                ?verdict,
                "evaluated restriction"
            );
            if verdict.is_reject() && first_reject.is_none() {
                first_reject = Some(restriction.name());
            }
            evaluations.push(RestrictionEvaluation {
                index,
                name: restriction.name(),
                verdict,
            });
        }

        let state = match first_reject {
            None => ValidationState::Valid,
            Some(restriction) => ValidationState::Invalid { restriction },
        };
        info!(license = %license.id(), product = %subject.product, ?state, "license validated");

        ValidationOutcome {
            license_id: license.id(),
            state,
            evaluations,
        }
    }
}
