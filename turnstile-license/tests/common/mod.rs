//! Shared test helpers for license tests.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{Signer, SigningKey};
use turnstile_license::{
    BetaRestriction, BuildType, DomainRestriction, Feature, Field, FieldValue,
    HardwareRestriction, License, LicenseId, MemoryRestriction, Restriction, TrialRestriction,
    UsageRestriction,
};

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// Creates a signed envelope: `base64url(document).base64url(signature)`.
/// Signs over the base64url-encoded document bytes.
pub fn seal(signing_key: &SigningKey, document: &str) -> String {
    let document_b64 = URL_SAFE_NO_PAD.encode(document.as_bytes());
    let signature = signing_key.sign(document_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    format!("{document_b64}.{sig_b64}")
}

/// One restriction of every built-in kind with non-zero state.
pub fn every_kind() -> Vec<Restriction> {
    vec![
        MemoryRestriction::new(4096).into(),
        TrialRestriction::new(30)
            .with_run_count(10)
            .with_run_instances(2)
            .into(),
        HardwareRestriction::new("HW-1234").into(),
        BetaRestriction::new(BuildType::Beta).into(),
        DomainRestriction::new("acme.example").into(),
        UsageRestriction::new(500).into(),
    ]
}

/// Zero-value instance of every built-in kind.
pub fn every_kind_zero() -> Vec<Restriction> {
    vec![
        MemoryRestriction::default().into(),
        TrialRestriction::default().into(),
        HardwareRestriction::default().into(),
        BetaRestriction::default().into(),
        DomainRestriction::default().into(),
        UsageRestriction::default().into(),
    ]
}

/// A license shaped like a typical commercial grant.
pub fn sample_license() -> License {
    License::builder(LicenseId::new())
        .feature(
            Feature::new("Reporting")
                .with_description("Scheduled reports")
                .with_data("daily,weekly"),
        )
        .feature(Feature::new("Export"))
        .field(Field::new("field1").with_value(FieldValue::Text("Acme & Co <EU>".into())))
        .field(Field::new("field2").with_value(FieldValue::Number(25.0)))
        .restriction(MemoryRestriction::new(4096))
        .restriction(TrialRestriction::new(30))
        .build()
        .unwrap()
}
