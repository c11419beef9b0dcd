//! Access tracking and usage reports.
//!
//! [`TrackedLicense`] counts reads of feature data, field values and
//! restriction state. The counts feed a [`UsageReport`] that a
//! [`ReportSink`] delivers; how a sink transports it is up to the sink.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{FieldValue, License, LicenseId};
use crate::restriction::{Property, Restriction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// What part of a license was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Feature,
    Field,
    Restriction,
}

/// Number of reads of one named license part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCount {
    pub kind: AccessKind,
    pub name: String,
    pub count: u64,
}

/// Read counters keyed by license part.
#[derive(Debug, Default)]
pub struct UsageTracker {
    counts: Mutex<BTreeMap<(AccessKind, String), u64>>,
}

impl UsageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: AccessKind, name: &str) {
        // A poisoned lock only means another reader panicked mid-increment.
        let mut counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        *counts.entry((kind, name.to_string())).or_insert(0) += 1;
    }

    #[must_use]
    pub fn count(&self, kind: AccessKind, name: &str) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        counts.get(&(kind, name.to_string())).copied().unwrap_or(0)
    }

    /// All counters, ordered by kind then name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AccessCount> {
        let counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        counts
            .iter()
            .map(|((kind, name), count)| AccessCount {
                kind: *kind,
                name: name.clone(),
                count: *count,
            })
            .collect()
    }
}

/// A license whose reads are counted.
#[derive(Debug)]
pub struct TrackedLicense {
    license: License,
    tracker: UsageTracker,
}

impl TrackedLicense {
    #[must_use]
    pub fn new(license: License) -> Self {
        Self {
            license,
            tracker: UsageTracker::new(),
        }
    }

    /// The underlying license. Reads through this are not counted.
    #[must_use]
    pub fn license(&self) -> &License {
        &self.license
    }

    #[must_use]
    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    /// Data payload of feature `name`.
    #[must_use]
    pub fn feature_data(&self, name: &str) -> Option<&str> {
        let feature = self.license.feature(name)?;
        self.tracker.record(AccessKind::Feature, name);
        feature.data.as_deref()
    }

    /// Value of field `name`.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<&FieldValue> {
        let field = self.license.field(name)?;
        self.tracker.record(AccessKind::Field, name);
        Some(&field.value)
    }

    /// Restrictions, counting one read per restriction.
    #[must_use]
    pub fn restrictions(&self) -> &[Restriction] {
        for r in self.license.restrictions() {
            self.tracker.record(AccessKind::Restriction, r.name());
        }
        self.license.restrictions()
    }

    /// State of the restriction at `index`.
    #[must_use]
    pub fn restriction_properties(&self, index: usize) -> Option<Vec<Property>> {
        let r = self.license.restrictions().get(index)?;
        self.tracker.record(AccessKind::Restriction, r.name());
        Some(r.properties())
    }

    /// Builds a report of the reads so far.
    #[must_use]
    pub fn report(&self, client_id: &str, user_key: &str) -> UsageReport {
        UsageReport {
            client_id: client_id.to_string(),
            user_key: user_key.to_string(),
            license_id: Some(self.license.id()),
            generated_at: Utc::now(),
            properties: BTreeMap::new(),
            accesses: self.tracker.snapshot(),
        }
    }
}

/// Usage report for one client and user key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub client_id: String,
    pub user_key: String,
    pub license_id: Option<LicenseId>,
    pub generated_at: DateTime<Utc>,
    /// Free-form context added by the application before sending.
    pub properties: BTreeMap<String, String>,
    pub accesses: Vec<AccessCount>,
}

impl UsageReport {
    /// A report with no license and no recorded reads.
    #[must_use]
    pub fn empty(client_id: &str, user_key: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            user_key: user_key.to_string(),
            license_id: None,
            generated_at: Utc::now(),
            properties: BTreeMap::new(),
            accesses: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn to_json(&self) -> LicenseResult<String> {
        serde_json::to_string_pretty(self).map_err(LicenseError::from)
    }
}

/// Destination for usage reports.
pub trait ReportSink: Send + Sync {
    fn send(&self, report: &UsageReport) -> LicenseResult<()>;
}
