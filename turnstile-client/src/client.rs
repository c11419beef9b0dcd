//! The validate and report flows.

use crate::config::ClientConfig;
use anyhow::{Context, Result};
use std::env;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use turnstile_lease::FloatingLeaseManager;
use turnstile_license::{
    Clock, FileLicenseSource, FileUsageStore, HostSystem, InstanceGuard, InstanceRegistry,
    LicenseSource, LicenseValidator, ReportSink, Restriction, SignedLicense, Subject, SystemClock, SystemInformation,
    TrackedLicense, UsageReport, UsageStore, ValidationContext, ValidationOutcome,
    standard_codec,
};

/// Result of one validation run.
#[derive(Debug)]
pub struct Session {
    pub license: TrackedLicense,
    pub context: ValidationContext,
    pub outcome: ValidationOutcome,
}

/// Validates the configured product and reports on it.
pub struct Client {
    config: ClientConfig,
    subject: Subject,
    leases: Arc<FloatingLeaseManager>,
    source: Box<dyn LicenseSource>,
    system: Box<dyn SystemInformation>,
    clock: Box<dyn Clock>,
    usage: Box<dyn UsageStore>,
    instance: InstanceGuard,
}

impl Client {
    /// Builds a client reading from the host and the configured files.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let verifier = SignedLicense::from_base64(&config.public_key, standard_codec())
            .context("loading issuer public key")?;
        let usage_path = match &config.usage_path {
            Some(path) => path.clone(),
            None => FileUsageStore::default_path().context("locating usage counters")?,
        };
        let instances = match &config.instances_path {
            Some(path) => InstanceRegistry::open(path),
            None => InstanceRegistry::open(
                InstanceRegistry::default_dir().context("locating instance markers")?,
            ),
        };
        let instance = instances
            .register(&config.product)
            .context("registering running instance")?;
        Ok(Self {
            subject: Subject::new(&config.product).with_version(env!("CARGO_PKG_VERSION")),
            leases: Arc::new(FloatingLeaseManager::local(config.lease.clone())),
            source: Box::new(FileLicenseSource::new(&config.license_path, verifier)),
            system: Box::new(HostSystem::with_instances(instances)),
            clock: Box::new(SystemClock),
            usage: Box::new(FileUsageStore::open(usage_path)),
            instance,
            config,
        })
    }

    #[must_use]
    pub fn with_system(mut self, system: impl SystemInformation + 'static) -> Self {
        self.system = Box::new(system);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_usage_store(mut self, usage: impl UsageStore + 'static) -> Self {
        self.usage = Box::new(usage);
        self
    }

    /// Shares a lease manager, e.g. one fronting a remote authority.
    #[must_use]
    pub fn with_lease_manager(mut self, leases: Arc<FloatingLeaseManager>) -> Self {
        self.leases = leases;
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// This client's registration as a running instance of the product.
    #[must_use]
    pub fn instance(&self) -> &InstanceGuard {
        &self.instance
    }

    #[must_use]
    pub fn leases(&self) -> &Arc<FloatingLeaseManager> {
        &self.leases
    }

    /// Validates the license while holding a floating lease.
    ///
    /// The lease is released whether validation succeeds, rejects, or fails.
    pub async fn validate(&self) -> Result<Session> {
        let holder = &self.config.user_key;
        let product = &self.config.product;
        let session = self
            .leases
            .with_lease(holder, product, |lease| async move {
                info!(%lease, "floating license acquired");
                self.validate_now()
            })
            .await
            .context("floating license")??;
        info!(holder = %holder, product = %product, "floating license released");
        Ok(session)
    }

    /// Validates without a lease.
    pub fn validate_now(&self) -> Result<Session> {
        let license = self.source.load().context("loading license")?;
        let context = ValidationContext::collect(
            &self.config.product,
            self.system.as_ref(),
            self.clock.as_ref(),
            self.usage.as_ref(),
        )
        .context("collecting validation context")?;
        let outcome = LicenseValidator::new().validate(&license, &context, &self.subject);
        if !outcome.is_valid() {
            warn!(rejected = ?outcome.rejections(), "license rejected");
        }
        Ok(Session {
            license: TrackedLicense::new(license),
            context,
            outcome,
        })
    }

    /// Builds a usage report and hands it to `sink`.
    ///
    /// With a session the report carries its read counts; without one it is
    /// a bare check-in.
    pub fn report(&self, session: Option<&Session>, sink: &dyn ReportSink) -> Result<UsageReport> {
        let report = match session {
            Some(session) => session
                .license
                .report(&self.config.client_id, &self.config.user_key),
            None => UsageReport::empty(&self.config.client_id, &self.config.user_key),
        };
        let report = report
            .with_property("cmdline", env::args().collect::<Vec<_>>().join(" "))
            .with_property("username", username())
            .with_property("product", &self.config.product);
        sink.send(&report).context("sending usage report")?;
        info!(service_url = %self.config.service_url, "usage report sent");
        Ok(report)
    }
}

fn username() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_default()
}

/// Prints a session: the verdict, then every feature, field and restriction.
///
/// Reads go through the tracked license, so they show up in the next report.
pub fn render(session: &Session, out: &mut dyn Write) -> std::io::Result<()> {
    let license = session.license.license();
    match session.outcome.rejected_by() {
        None => writeln!(out, "License validated: {}", license.id())?,
        Some(_) => writeln!(
            out,
            "License {} rejected by: {}",
            license.id(),
            session.outcome.rejections().join(", ")
        )?,
    }

    for feature in license.features() {
        let _ = session.license.feature_data(&feature.name);
        match &feature.description {
            Some(description) => writeln!(out, "  Feature: {} - {description}", feature.name)?,
            None => writeln!(out, "  Feature: {}", feature.name)?,
        }
    }

    for field in license.fields() {
        if let Some(value) = session.license.field_value(&field.name) {
            writeln!(out, "  Field: {} = {value}", field.name)?;
        }
    }

    for (index, restriction) in license.restrictions().iter().enumerate() {
        writeln!(out, "  Restriction: {}", restriction.name())?;
        let mut props: Vec<String> = session
            .license
            .restriction_properties(index)
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect();
        if let Restriction::Trial(trial) = restriction {
            if let Some(left) = trial.time_left(&session.context) {
                props.push(format!("TimeLeft: {}d", left.num_days()));
            }
        }
        if !props.is_empty() {
            writeln!(out, "    {}", props.join(", "))?;
        }
    }
    Ok(())
}
