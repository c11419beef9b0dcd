//! Host system information for the validation context.
//!
//! Generates a stable hardware key that identifies this machine and reads the
//! facts hardware-bound and memory restrictions check against.

use crate::instances::InstanceRegistry;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use tracing::warn;

/// Provider of host facts.
pub trait SystemInformation: Send + Sync {
    /// Total physical memory in bytes.
    fn total_physical_memory(&self) -> u64;

    /// Stable identifier of this machine.
    fn hardware_key(&self) -> String;

    /// DNS domain the machine belongs to, if any.
    fn domain(&self) -> Option<String>;

    /// Instances of `product` currently running on this host.
    fn running_instances(&self, _product: &str) -> u32 {
        1
    }
}

/// Facts read from the machine this process runs on.
///
/// Running instances are counted from an [`InstanceRegistry`]. The caller
/// itself always counts, so the result is at least one.
#[derive(Debug, Clone)]
pub struct HostSystem {
    instances: Option<InstanceRegistry>,
}

impl HostSystem {
    /// Reads instances from the platform default marker directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instances: InstanceRegistry::default_dir().ok().map(InstanceRegistry::open),
        }
    }

    #[must_use]
    pub fn with_instances(instances: InstanceRegistry) -> Self {
        Self {
            instances: Some(instances),
        }
    }
}

impl Default for HostSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemInformation for HostSystem {
    fn total_physical_memory(&self) -> u64 {
        get_total_memory().unwrap_or(0)
    }

    fn hardware_key(&self) -> String {
        let components = collect_hardware_ids();
        let combined = components.join("|");

        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let hash = hasher.finalize();

        BASE64.encode(&hash[..16])
    }

    fn domain(&self) -> Option<String> {
        if let Ok(domain) = env::var("USERDNSDOMAIN") {
            if !domain.is_empty() {
                return Some(domain.to_lowercase());
            }
        }
        get_hostname()
            .split_once('.')
            .map(|(_, domain)| domain.to_lowercase())
            .filter(|d| !d.is_empty())
    }

    fn running_instances(&self, product: &str) -> u32 {
        let Some(instances) = &self.instances else {
            return 1;
        };
        match instances.count(product) {
            Ok(n) => n.max(1),
            Err(e) => {
                warn!(product, error = %e, "could not count running instances");
                1
            }
        }
    }
}

/// Fixed host facts, for embedding applications that gather them elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSystem {
    pub total_physical_memory: u64,
    pub hardware_key: String,
    pub domain: Option<String>,
    #[serde(default = "one")]
    pub running_instances: u32,
}

fn one() -> u32 {
    1
}

impl SystemInformation for StaticSystem {
    fn total_physical_memory(&self) -> u64 {
        self.total_physical_memory
    }

    fn hardware_key(&self) -> String {
        self.hardware_key.clone()
    }

    fn domain(&self) -> Option<String> {
        self.domain.clone()
    }

    fn running_instances(&self, _product: &str) -> u32 {
        self.running_instances
    }
}

/// Collects hardware identifiers for the hardware key.
fn collect_hardware_ids() -> Vec<String> {
    let mut ids = Vec::new();

    // OS and architecture (stable)
    ids.push(env::consts::OS.to_string());
    ids.push(env::consts::ARCH.to_string());

    ids.push(get_hostname());

    // Machine ID (platform-specific, very stable)
    if let Some(machine_id) = get_machine_id() {
        ids.push(machine_id);
    }

    ids
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reads total physical memory in bytes.
fn get_total_memory() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        // "MemTotal:       16318436 kB"
        std::fs::read_to_string("/proc/meminfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("MemTotal:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok())
                .map(|kb| kb * 1024)
        })
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|s| s.trim().parse().ok())
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("wmic")
            .args(["ComputerSystem", "get", "TotalPhysicalMemory", "/value"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find_map(|l| l.trim().strip_prefix("TotalPhysicalMemory="))
                    .and_then(|v| v.trim().parse().ok())
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

/// Gets the machine ID (platform-specific unique identifier).
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "windows")]
    {
        // Would use Windows registry MachineGuid in production
        None
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
