use std::fs;
use tempfile::TempDir;
use turnstile_license::{
    HostSystem, InstanceRegistry, License, LicenseId, LicenseValidator, MemoryUsageStore,
    StaticSystem, Subject, SystemClock, SystemInformation, TrialRestriction, ValidationContext,
};

#[test]
fn host_hardware_key_is_stable() {
    let host = HostSystem::new();
    let a = host.hardware_key();
    let b = host.hardware_key();
    assert_eq!(a, b);
    // 16 bytes of SHA-256, standard base64.
    assert_eq!(a.len(), 24);
}

#[test]
fn host_counts_at_least_the_caller() {
    let dir = TempDir::new().unwrap();
    let host = HostSystem::with_instances(InstanceRegistry::open(dir.path()));
    assert_eq!(host.running_instances("ProductX"), 1);
}

#[test]
fn host_counts_registered_instances() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path());
    let host = HostSystem::with_instances(registry.clone());

    let first = registry.register("ProductX").unwrap();
    let second = registry.register("ProductX").unwrap();
    let _other = registry.register("ProductY").unwrap();
    assert_eq!(host.running_instances("ProductX"), 2);

    drop(second);
    assert_eq!(host.running_instances("ProductX"), 1);
    drop(first);
    assert_eq!(registry.count("ProductX").unwrap(), 0);
}

#[test]
fn dead_instances_are_not_counted_and_are_removed() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path());
    let _live = registry.register("ProductX").unwrap();

    // Above any pid the kernel hands out.
    let stale = registry.register_pid("ProductX", u32::MAX - 1).unwrap();
    let stale_path = stale.path().to_path_buf();
    std::mem::forget(stale);

    assert_eq!(registry.count("ProductX").unwrap(), 1);
    assert!(!stale_path.exists());
}

#[test]
fn unreadable_marker_names_are_ignored() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path());
    let _live = registry.register("ProductX").unwrap();
    fs::write(dir.path().join("ProductX").join("notes.txt"), b"").unwrap();
    assert_eq!(registry.count("ProductX").unwrap(), 1);
}

#[test]
fn product_names_are_kept_inside_the_registry() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path());
    let guard = registry.register("../Product X").unwrap();
    assert!(guard.path().starts_with(dir.path()));
    assert_eq!(registry.count("../Product X").unwrap(), 1);
}

#[test]
fn second_instance_exceeds_single_instance_trial() {
    let dir = TempDir::new().unwrap();
    let registry = InstanceRegistry::open(dir.path());
    let host = HostSystem::with_instances(registry.clone());
    let license = License::builder(LicenseId::new())
        .restriction(TrialRestriction::default().with_run_instances(1))
        .build()
        .unwrap();
    let usage = MemoryUsageStore::new();
    let validate = || {
        let ctx = ValidationContext::collect("ProductX", &host, &SystemClock, &usage).unwrap();
        LicenseValidator::new().validate(&license, &ctx, &Subject::new("ProductX"))
    };

    let _first = registry.register("ProductX").unwrap();
    assert!(validate().is_valid());

    let second = registry.register("ProductX").unwrap();
    let outcome = validate();
    assert!(!outcome.is_valid());
    assert_eq!(outcome.rejected_by(), Some("Trial"));

    drop(second);
    assert!(validate().is_valid());
}

#[cfg(target_os = "linux")]
#[test]
fn host_memory_is_read_on_linux() {
    assert!(HostSystem::new().total_physical_memory() > 0);
}

#[test]
fn static_system_returns_its_facts() {
    let system = StaticSystem {
        total_physical_memory: 1 << 30,
        hardware_key: "HW-1".into(),
        domain: Some("acme.example".into()),
        running_instances: 3,
    };
    assert_eq!(system.total_physical_memory(), 1 << 30);
    assert_eq!(system.hardware_key(), "HW-1");
    assert_eq!(system.domain().as_deref(), Some("acme.example"));
    assert_eq!(system.running_instances("ProductX"), 3);
}

#[test]
fn static_system_defaults_to_one_instance_when_deserialized() {
    let system: StaticSystem =
        serde_json::from_str(r#"{"total_physical_memory":0,"hardware_key":"k","domain":null}"#)
            .unwrap();
    assert_eq!(system.running_instances, 1);
}
