//! Shared test helpers for client tests.

#![allow(dead_code)]

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signer, SigningKey};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use turnstile_client::ClientConfig;
use turnstile_lease::LeaseConfig;
use turnstile_license::{
    Feature, Field, FieldValue, License, LicenseId, MemoryRestriction, TrialRestriction,
    standard_codec,
};

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42u8; 32])
}

/// A commercial license requiring 4096 MB.
pub fn license() -> License {
    License::builder(LicenseId::new())
        .feature(Feature::new("Reporting").with_description("Scheduled reports"))
        .field(Field::new("field2").with_value(FieldValue::Number(25.0)))
        .restriction(MemoryRestriction::new(4096))
        .restriction(TrialRestriction::new(30))
        .build()
        .unwrap()
}

pub fn write_signed(path: &Path, license: &License) {
    let document = standard_codec().encode_license(license).unwrap();
    let document_b64 = URL_SAFE_NO_PAD.encode(document.as_bytes());
    let signature = signing_key().sign(document_b64.as_bytes());
    let envelope = format!(
        "{document_b64}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    );
    fs::write(path, envelope).unwrap();
}

/// A config pointing into `dir`, with a signed license already written.
pub fn setup(dir: &TempDir) -> ClientConfig {
    let license_path = dir.path().join("license.key");
    write_signed(&license_path, &license());
    ClientConfig {
        client_id: "ACME EquiTrack".into(),
        service_url: "http://localhost:5000".into(),
        user_key: "25MPF-5QETJ".into(),
        product: "ProductX".into(),
        public_key: STANDARD.encode(signing_key().verifying_key().to_bytes()),
        license_path,
        usage_path: Some(dir.path().join("usage.json")),
        instances_path: Some(dir.path().join("instances")),
        lease: LeaseConfig::default().with_capacity(1),
    }
}
