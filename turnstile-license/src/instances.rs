//! Running instances of a product on this host.
//!
//! Every registered instance owns one marker file named `<pid>.<id>` under
//! `<dir>/<product>/`. Counting checks each pid against the live process
//! table and removes markers left behind by processes that died without
//! cleaning up.

use crate::error::{LicenseError, LicenseResult};
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};
use uuid::Uuid;

/// Marker directory shared by every instance of every product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRegistry {
    dir: PathBuf,
}

impl InstanceRegistry {
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the platform default marker directory.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if no local data directory exists for this user.
    pub fn default_dir() -> LicenseResult<PathBuf> {
        dirs::data_local_dir()
            .map(|d| d.join("turnstile").join("instances"))
            .ok_or_else(|| LicenseError::Storage("no local data directory".into()))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registers the current process as a running instance of `product`.
    pub fn register(&self, product: &str) -> LicenseResult<InstanceGuard> {
        self.register_pid(product, std::process::id())
    }

    /// Registers `pid` as a running instance of `product`.
    ///
    /// One process may hold several registrations; each counts once.
    pub fn register_pid(&self, product: &str, pid: u32) -> LicenseResult<InstanceGuard> {
        let dir = self.product_dir(product);
        fs::create_dir_all(&dir)
            .map_err(|e| LicenseError::Storage(format!("creating {}: {e}", dir.display())))?;
        let path = dir.join(format!("{pid}.{}", Uuid::new_v4().simple()));
        fs::write(&path, b"")
            .map_err(|e| LicenseError::Storage(format!("writing {}: {e}", path.display())))?;
        debug!(product, pid, "instance registered");
        Ok(InstanceGuard { path })
    }

    /// Counts the live registrations of `product`, removing stale markers.
    pub fn count(&self, product: &str) -> LicenseResult<u32> {
        let dir = self.product_dir(product);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(LicenseError::Storage(format!("reading {}: {e}", dir.display())));
            }
        };

        let mut markers = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| LicenseError::Storage(format!("reading {}: {e}", dir.display())))?;
            let name = entry.file_name();
            let pid = name
                .to_str()
                .and_then(|n| n.split_once('.'))
                .and_then(|(pid, _)| pid.parse::<usize>().ok());
            if let Some(pid) = pid {
                markers.push((Pid::from(pid), entry.path()));
            }
        }
        if markers.is_empty() {
            return Ok(0);
        }

        let pids: Vec<Pid> = markers.iter().map(|(pid, _)| *pid).collect();
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&pids));

        let mut live = 0u32;
        for (pid, path) in markers {
            if system.process(pid).is_some() {
                live = live.saturating_add(1);
            } else if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not remove stale instance marker");
            } else {
                debug!(product, %pid, "stale instance marker removed");
            }
        }
        Ok(live)
    }

    fn product_dir(&self, product: &str) -> PathBuf {
        let name: String = product
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(name)
    }
}

/// A registration; the marker is removed when the guard drops.
#[derive(Debug)]
#[must_use = "the instance is unregistered as soon as the guard drops"]
pub struct InstanceGuard {
    path: PathBuf,
}

impl InstanceGuard {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "could not remove instance marker");
            }
        }
    }
}
