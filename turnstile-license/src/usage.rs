//! Run and usage counters consumed by trial and usage restrictions.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Counters for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub run_count: u64,
    pub usage_count: u64,
    pub first_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    fn record_run(&mut self, at: DateTime<Utc>) {
        self.run_count += 1;
        self.first_run.get_or_insert(at);
        self.last_run = Some(at);
    }
}

/// Persistent per-product counters.
pub trait UsageStore: Send + Sync {
    /// Reads the counters for `product` without changing them.
    fn snapshot(&self, product: &str) -> LicenseResult<UsageSnapshot>;

    /// Records one run of `product` at `at` and returns the updated counters.
    fn record_run(&self, product: &str, at: DateTime<Utc>) -> LicenseResult<UsageSnapshot>;

    /// Adds `units` to the metered usage of `product`.
    fn record_usage(&self, product: &str, units: u64) -> LicenseResult<UsageSnapshot>;
}

/// In-memory counters, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    counters: Mutex<HashMap<String, UsageSnapshot>>,
}

impl MemoryUsageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update(
        &self,
        product: &str,
        f: impl FnOnce(&mut UsageSnapshot),
    ) -> LicenseResult<UsageSnapshot> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| LicenseError::Storage("usage counters poisoned".into()))?;
        let entry = counters.entry(product.to_string()).or_default();
        f(entry);
        Ok(entry.clone())
    }
}

impl UsageStore for MemoryUsageStore {
    fn snapshot(&self, product: &str) -> LicenseResult<UsageSnapshot> {
        let counters = self
            .counters
            .lock()
            .map_err(|_| LicenseError::Storage("usage counters poisoned".into()))?;
        Ok(counters.get(product).cloned().unwrap_or_default())
    }

    fn record_run(&self, product: &str, at: DateTime<Utc>) -> LicenseResult<UsageSnapshot> {
        self.update(product, |s| s.record_run(at))
    }

    fn record_usage(&self, product: &str, units: u64) -> LicenseResult<UsageSnapshot> {
        self.update(product, |s| s.usage_count = s.usage_count.saturating_add(units))
    }
}

/// Counters persisted as a JSON file.
///
/// The whole file is rewritten on every update; it holds one small entry per
/// product.
#[derive(Debug)]
pub struct FileUsageStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUsageStore {
    /// Opens a store at `path`. The file is created on first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the platform default location of the usage file.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if no local data directory exists for this user.
    pub fn default_path() -> LicenseResult<PathBuf> {
        dirs::data_local_dir()
            .map(|d| d.join("turnstile").join("usage.json"))
            .ok_or_else(|| LicenseError::Storage("no local data directory".into()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> LicenseResult<HashMap<String, UsageSnapshot>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(LicenseError::Storage(format!(
                "reading {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, counters: &HashMap<String, UsageSnapshot>) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LicenseError::Storage(format!("creating {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_vec_pretty(counters)?;
        fs::write(&self.path, json)
            .map_err(|e| LicenseError::Storage(format!("writing {}: {e}", self.path.display())))
    }

    fn update(
        &self,
        product: &str,
        f: impl FnOnce(&mut UsageSnapshot),
    ) -> LicenseResult<UsageSnapshot> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| LicenseError::Storage("usage file lock poisoned".into()))?;
        let mut counters = self.load()?;
        let entry = counters.entry(product.to_string()).or_default();
        f(entry);
        let updated = entry.clone();
        self.save(&counters)?;
        Ok(updated)
    }
}

impl UsageStore for FileUsageStore {
    fn snapshot(&self, product: &str) -> LicenseResult<UsageSnapshot> {
        Ok(self.load()?.remove(product).unwrap_or_default())
    }

    fn record_run(&self, product: &str, at: DateTime<Utc>) -> LicenseResult<UsageSnapshot> {
        self.update(product, |s| s.record_run(at))
    }

    fn record_usage(&self, product: &str, units: u64) -> LicenseResult<UsageSnapshot> {
        self.update(product, |s| s.usage_count = s.usage_count.saturating_add(units))
    }
}
