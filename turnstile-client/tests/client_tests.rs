mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;
use turnstile_client::{Client, JsonReportSink, render};
use turnstile_lease::{FloatingLeaseManager, LeaseConfig, LeaseError};
use turnstile_license::{
    AccessKind, InstanceRegistry, MemoryUsageStore, StaticSystem, UsageReport, ValidationState,
};

fn host(memory_mb: u64) -> StaticSystem {
    StaticSystem {
        total_physical_memory: memory_mb * 1024 * 1024,
        hardware_key: "HW-1".into(),
        domain: None,
        running_instances: 1,
    }
}

// ── Validate ────────────────────────────────────────────────────

#[tokio::test]
async fn valid_on_large_host_and_lease_released() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(8192));

    let session = client.validate().await.unwrap();
    assert!(session.outcome.is_valid());
    assert!(!client.leases().holds("25MPF-5QETJ", "ProductX"));
}

#[tokio::test]
async fn invalid_on_small_host_and_lease_still_released() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(2048));

    let session = client.validate().await.unwrap();
    assert_eq!(
        session.outcome.state,
        ValidationState::Invalid {
            restriction: "Memory"
        }
    );
    assert!(!client.leases().holds("25MPF-5QETJ", "ProductX"));

    // The slot is free again.
    client.validate().await.unwrap();
}

#[tokio::test]
async fn broken_license_is_an_error_and_lease_released() {
    let dir = TempDir::new().unwrap();
    let config = common::setup(&dir);
    std::fs::write(&config.license_path, "garbage").unwrap();
    let client = Client::from_config(config).unwrap().with_system(host(8192));

    let err = client.validate().await.unwrap_err();
    assert!(format!("{err:#}").contains("loading license"));
    assert!(!client.leases().holds("25MPF-5QETJ", "ProductX"));
}

#[tokio::test(start_paused = true)]
async fn busy_pool_is_capacity_exceeded() {
    let dir = TempDir::new().unwrap();
    let config = common::setup(&dir);
    let leases = Arc::new(FloatingLeaseManager::local(
        LeaseConfig::default()
            .with_capacity(1)
            .with_acquire_timeout(std::time::Duration::from_secs(1)),
    ));
    leases.acquire("someone-else", "ProductX").await.unwrap();

    let client = Client::from_config(config)
        .unwrap()
        .with_system(host(8192))
        .with_lease_manager(Arc::clone(&leases));

    let err = client.validate().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LeaseError>(),
        Some(LeaseError::CapacityExceeded { .. })
    ));
}

#[tokio::test]
async fn each_validation_records_a_run() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(8192));

    client.validate().await.unwrap();
    let session = client.validate().await.unwrap();
    assert_eq!(session.context.run_count(), 2);
    assert!(dir.path().join("usage.json").exists());
}

#[tokio::test]
async fn in_memory_usage_store() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(8192))
        .with_usage_store(MemoryUsageStore::new());

    let session = client.validate().await.unwrap();
    assert_eq!(session.context.run_count(), 1);
    assert!(!dir.path().join("usage.json").exists());
}

// ── Render ──────────────────────────────────────────────────────

#[tokio::test]
async fn render_lists_grants_and_counts_reads() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(8192));
    let session = client.validate().await.unwrap();

    let mut out = Vec::new();
    render(&session, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("License validated: "));
    assert!(text.contains("  Feature: Reporting - Scheduled reports\n"));
    assert!(text.contains("  Field: field2 = 25\n"));
    assert!(text.contains("  Restriction: Memory\n    TotalMemory: 4096\n"));
    assert!(text.contains("ExpireDays: 30, RunCount: 0, RunInstances: 0, TimeLeft: 30d"));

    let tracker = session.license.tracker();
    assert_eq!(tracker.count(AccessKind::Feature, "Reporting"), 1);
    assert_eq!(tracker.count(AccessKind::Field, "field2"), 1);
    assert_eq!(tracker.count(AccessKind::Restriction, "Trial"), 1);
}

#[tokio::test]
async fn render_names_every_rejection() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(1024));
    let session = client.validate().await.unwrap();

    let mut out = Vec::new();
    render(&session, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("rejected by: Memory"));
}

// ── Report ──────────────────────────────────────────────────────

#[tokio::test]
async fn report_with_session_carries_counts() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir))
        .unwrap()
        .with_system(host(8192));
    let session = client.validate().await.unwrap();
    render(&session, &mut Vec::new()).unwrap();

    let path = dir.path().join("report.json");
    let sent = client
        .report(Some(&session), &JsonReportSink::file(&path))
        .unwrap();

    let written: UsageReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, sent);
    assert_eq!(written.client_id, "ACME EquiTrack");
    assert_eq!(written.license_id, Some(session.license.license().id()));
    assert!(written.properties.contains_key("cmdline"));
    assert!(written.properties.contains_key("username"));
    assert_eq!(written.properties["product"], "ProductX");
    assert!(!written.accesses.is_empty());
}

#[tokio::test]
async fn report_without_session_is_a_check_in() {
    let dir = TempDir::new().unwrap();
    let client = Client::from_config(common::setup(&dir)).unwrap();

    let path = dir.path().join("report.json");
    let sent = client.report(None, &JsonReportSink::file(&path)).unwrap();
    assert!(sent.license_id.is_none());
    assert!(sent.accesses.is_empty());
}

#[test]
fn each_client_is_a_running_instance_until_dropped() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path().join("instances"));

    let first = Client::from_config(common::setup(&dir)).unwrap();
    assert!(first.instance().path().exists());
    let second = Client::from_config(common::setup(&dir)).unwrap();
    assert_eq!(registry.count("ProductX").unwrap(), 2);

    drop(second);
    assert_eq!(registry.count("ProductX").unwrap(), 1);
    drop(first);
    assert_eq!(registry.count("ProductX").unwrap(), 0);
}

#[test]
fn bad_public_key_fails_construction() {
    let dir = TempDir::new().unwrap();
    let mut config = common::setup(&dir);
    config.public_key = "not-a-key".into();
    let err = Client::from_config(config).err().unwrap();
    assert!(format!("{err:#}").contains("issuer public key"));
}
