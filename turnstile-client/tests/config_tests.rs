mod common;

use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use turnstile_client::ClientConfig;

#[test]
fn loads_json_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("turnstile.json");
    fs::write(
        &path,
        r#"{
            "client_id": "ACME EquiTrack",
            "service_url": "https://licensing.example",
            "user_key": "25MPF-5QETJ",
            "product": "ProductX",
            "public_key": "AAAA",
            "license_path": "license.key",
            "lease": { "capacity": 5, "acquire_timeout_secs": 3 }
        }"#,
    )
    .unwrap();

    let config = ClientConfig::load(&path).unwrap();
    assert_eq!(config.client_id, "ACME EquiTrack");
    assert_eq!(config.usage_path, None);
    assert_eq!(config.instances_path, None);
    assert_eq!(config.lease.capacity, 5);
    assert_eq!(config.lease.acquire_timeout, Duration::from_secs(3));
}

#[test]
fn service_url_and_key_have_no_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("turnstile.json");
    fs::write(
        &path,
        r#"{"client_id":"c","user_key":"u","product":"p","license_path":"l"}"#,
    )
    .unwrap();
    let err = ClientConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("parsing config"));
}

#[test]
fn rejects_unusable_values() {
    let dir = TempDir::new().unwrap();
    let base = common::setup(&dir);

    let mut config = base.clone();
    config.service_url = "localhost:5000".into();
    assert!(config.check().is_err());

    let mut config = base.clone();
    config.user_key = "  ".into();
    assert!(config.check().is_err());

    let mut config = base.clone();
    config.lease.capacity = 0;
    assert!(config.check().is_err());

    assert!(base.check().is_ok());
}

#[test]
fn missing_file_names_the_path() {
    let err = ClientConfig::load("/nonexistent/turnstile.json".as_ref()).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/turnstile.json"));
}
