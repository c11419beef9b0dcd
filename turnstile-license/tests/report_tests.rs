mod common;

use common::sample_license;
use turnstile_license::{AccessKind, FieldValue, TrackedLicense, UsageReport};

#[test]
fn reads_are_counted() {
    let tracked = TrackedLicense::new(sample_license());

    assert_eq!(tracked.feature_data("Reporting"), Some("daily,weekly"));
    assert_eq!(tracked.feature_data("Reporting"), Some("daily,weekly"));
    assert_eq!(tracked.feature_data("Export"), None);
    assert_eq!(
        tracked.field_value("field2"),
        Some(&FieldValue::Number(25.0))
    );
    assert_eq!(tracked.restrictions().len(), 2);

    let tracker = tracked.tracker();
    assert_eq!(tracker.count(AccessKind::Feature, "Reporting"), 2);
    assert_eq!(tracker.count(AccessKind::Feature, "Export"), 1);
    assert_eq!(tracker.count(AccessKind::Field, "field2"), 1);
    assert_eq!(tracker.count(AccessKind::Restriction, "Memory"), 1);
    assert_eq!(tracker.count(AccessKind::Restriction, "Trial"), 1);
}

#[test]
fn missing_parts_are_not_counted() {
    let tracked = TrackedLicense::new(sample_license());
    assert_eq!(tracked.feature_data("Nope"), None);
    assert_eq!(tracked.field_value("nope"), None);
    assert!(tracked.restriction_properties(99).is_none());
    assert!(tracked.tracker().snapshot().is_empty());
}

#[test]
fn underlying_license_reads_are_free() {
    let tracked = TrackedLicense::new(sample_license());
    assert_eq!(tracked.license().features().len(), 2);
    assert!(tracked.tracker().snapshot().is_empty());
}

#[test]
fn restriction_properties_by_index() {
    let tracked = TrackedLicense::new(sample_license());
    let props = tracked.restriction_properties(0).unwrap();
    assert_eq!(props[0].name, "TotalMemory");
    assert_eq!(props[0].value, "4096");
    assert_eq!(tracked.tracker().count(AccessKind::Restriction, "Memory"), 1);
}

#[test]
fn report_carries_counts_in_order() {
    let tracked = TrackedLicense::new(sample_license());
    let _ = tracked.field_value("field1");
    let _ = tracked.feature_data("Reporting");

    let report = tracked
        .report("client-1", "user-key")
        .with_property("username", "alice");

    assert_eq!(report.client_id, "client-1");
    assert_eq!(report.license_id, Some(tracked.license().id()));
    assert_eq!(report.properties["username"], "alice");
    let kinds: Vec<AccessKind> = report.accesses.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AccessKind::Feature, AccessKind::Field]);
}

#[test]
fn report_json_roundtrips() {
    let report = UsageReport::empty("client-1", "user-key").with_property("cmdline", "app --x");
    let json = report.to_json().unwrap();
    assert!(json.contains("\"cmdline\""));
    let parsed: UsageReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);
    assert!(parsed.license_id.is_none());
}
