//! Client configuration.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use turnstile_lease::LeaseConfig;

/// Everything the client needs to validate and report.
///
/// Read from a JSON file; there are no built-in defaults for the service URL
/// or the issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name reported to the licensing service.
    pub client_id: String,
    /// Licensing service the reports are addressed to.
    pub service_url: String,
    /// Customer license key; also the lease holder.
    pub user_key: String,
    /// Product being licensed.
    pub product: String,
    /// Issuer Ed25519 public key, standard base64.
    pub public_key: String,
    /// Signed license envelope.
    pub license_path: PathBuf,
    /// Run and usage counters. Defaults to the platform data directory.
    #[serde(default)]
    pub usage_path: Option<PathBuf>,
    /// Markers of running instances. Defaults to the platform data directory.
    #[serde(default)]
    pub instances_path: Option<PathBuf>,
    #[serde(default)]
    pub lease: LeaseConfig,
}

impl ClientConfig {
    /// Loads and checks a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.check()?;
        Ok(config)
    }

    /// Rejects configurations that cannot work.
    pub fn check(&self) -> Result<()> {
        if !(self.service_url.starts_with("http://") || self.service_url.starts_with("https://")) {
            bail!("service_url must be an http(s) URL, got {:?}", self.service_url);
        }
        for (name, value) in [
            ("client_id", &self.client_id),
            ("user_key", &self.user_key),
            ("product", &self.product),
            ("public_key", &self.public_key),
        ] {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        if self.lease.capacity == 0 {
            bail!("lease.capacity must be at least 1");
        }
        Ok(())
    }
}
