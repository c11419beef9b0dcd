//! Signed license envelopes and Ed25519 verification.
//!
//! Signed licenses use the format: `base64url(document).base64url(signature)`
//!
//! The document is a license in markup form (see [`crate::codec`]). The
//! signature covers `document_b64.as_bytes()` (the base64url-encoded document,
//! not the decoded markup), so the envelope can be verified before anything
//! is parsed.

use crate::codec::RestrictionCodec;
use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Anything that can hand out a verified license.
pub trait LicenseSource: Send + Sync {
    fn load(&self) -> LicenseResult<License>;
}

/// Verifies signed license envelopes against one issuer key.
#[derive(Clone)]
pub struct SignedLicense {
    key: VerifyingKey,
    codec: RestrictionCodec,
}

impl SignedLicense {
    /// Creates a verifier for a raw 32-byte Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` if the bytes are not a valid curve point.
    pub fn new(public_key: &[u8; 32], codec: RestrictionCodec) -> LicenseResult<Self> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| LicenseError::InvalidKeyFormat("invalid public key".to_string()))?;
        Ok(Self { key, codec })
    }

    /// Creates a verifier from a standard base64 encoded public key.
    pub fn from_base64(public_key: &str, codec: RestrictionCodec) -> LicenseResult<Self> {
        let bytes = STANDARD.decode(public_key.trim()).map_err(|e| {
            LicenseError::InvalidKeyFormat(format!("invalid public key base64: {e}"))
        })?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            LicenseError::InvalidKeyFormat("public key must be 32 bytes".to_string())
        })?;
        Self::new(&bytes, codec)
    }

    /// Verifies an envelope and decodes the license inside it.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope is malformed, the signature does not
    /// verify, or the document is not a readable license.
    pub fn verify(&self, envelope: &str) -> LicenseResult<License> {
        let envelope = envelope.trim();

        let Some((document_b64, signature_b64)) = envelope.split_once('.') else {
            return Err(LicenseError::InvalidKeyFormat(
                "license must have exactly two parts separated by a dot".to_string(),
            ));
        };
        if signature_b64.contains('.') {
            return Err(LicenseError::InvalidKeyFormat(
                "license must have exactly two parts separated by a dot".to_string(),
            ));
        }

        let sig_bytes = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
            LicenseError::InvalidKeyFormat(format!("invalid signature base64: {e}"))
        })?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| LicenseError::InvalidKeyFormat("invalid signature length".to_string()))?;

        self.key
            .verify(document_b64.as_bytes(), &signature)
            .map_err(|_| LicenseError::InvalidSignature)?;

        let document = URL_SAFE_NO_PAD.decode(document_b64).map_err(|e| {
            LicenseError::InvalidKeyFormat(format!("invalid document base64: {e}"))
        })?;
        let document = String::from_utf8(document)
            .map_err(|e| LicenseError::InvalidPayload(format!("document is not UTF-8: {e}")))?;

        let license = self.codec.decode_license(&document).map_err(|e| match e {
            LicenseError::MalformedEncoding(msg) => LicenseError::InvalidPayload(msg),
            other => other,
        })?;
        debug!(license = %license.id(), "signed license verified");
        Ok(license)
    }
}

/// A signed license read from a file on every `load`.
#[derive(Clone)]
pub struct FileLicenseSource {
    path: PathBuf,
    verifier: SignedLicense,
}

impl FileLicenseSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, verifier: SignedLicense) -> Self {
        Self {
            path: path.into(),
            verifier,
        }
    }
}

impl LicenseSource for FileLicenseSource {
    fn load(&self) -> LicenseResult<License> {
        let envelope = fs::read_to_string(&self.path).map_err(|e| {
            LicenseError::Storage(format!("reading {}: {e}", self.path.display()))
        })?;
        self.verifier.verify(&envelope)
    }
}
