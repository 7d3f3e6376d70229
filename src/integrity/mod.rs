//! Anti-tampering protection (GB/T 33190 Annex, "完整性保护").
//!
//! Protection lists every file in the package in a manifest, signs the
//! manifest, and stores the signature inside the package. Verification
//! checks both that the manifest signature holds and that no file has been
//! added since; either check failing means the package was tampered with.
//!
//! The digest-then-sign step is pluggable through [`ProtectSigner`] and
//! [`ProtectVerifier`]; [`GmProtectSigner`] and [`GmProtectVerifier`] are
//! the GB/T 35275 implementations.

mod manifest;
mod protect;

pub use manifest::{Manifest, ManifestEntry};
pub use protect::{IntegrityReport, OfdIntegrity};

use crate::error::Result;
use crate::gm::sm2strut::{AttributeLayout, Gbt35275Verifier, SignedDataBuilder};
use crate::signatures::VerifyResult;
use log::debug;
use std::fs;
use std::path::Path;
use x509_cert::Certificate;

/// Produces the signed value protecting a manifest file.
pub trait ProtectSigner {
    /// Digest `file` and sign the digest.
    fn digest_then_sign(&self, file: &Path) -> Result<Vec<u8>>;
}

/// Checks a signed value against a manifest file.
pub trait ProtectVerifier {
    /// Re-digest `file` and verify `signed_value` over it.
    fn digest_then_verify(&self, file: &Path, signed_value: &[u8]) -> Result<VerifyResult>;
}

/// GB/T 35275 manifest signer (SM3 + SM2).
#[derive(Debug, Clone)]
pub struct GmProtectSigner {
    builder: SignedDataBuilder,
}

impl GmProtectSigner {
    /// Create a signer with the minimal attribute layout.
    pub fn new(key: sm2::SecretKey, certificate: Certificate) -> Self {
        Self {
            builder: SignedDataBuilder::new(key, certificate),
        }
    }

    /// Select the attribute layout of produced signatures.
    pub fn with_layout(mut self, layout: AttributeLayout) -> Self {
        self.builder = self.builder.with_layout(layout);
        self
    }
}

impl ProtectSigner for GmProtectSigner {
    fn digest_then_sign(&self, file: &Path) -> Result<Vec<u8>> {
        let data = fs::read(file)?;
        debug!("Signing {} ({} bytes)", file.display(), data.len());
        self.builder.sign(&data)?.to_signed_value()
    }
}

/// GB/T 35275 manifest verifier.
#[derive(Debug, Clone, Default)]
pub struct GmProtectVerifier {
    verifier: Gbt35275Verifier,
}

impl GmProtectVerifier {
    /// Create a verifier accepting either attribute layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept signatures in `layout`.
    pub fn expect_layout(mut self, layout: AttributeLayout) -> Self {
        self.verifier = self.verifier.expect_layout(layout);
        self
    }
}

impl ProtectVerifier for GmProtectVerifier {
    fn digest_then_verify(&self, file: &Path, signed_value: &[u8]) -> Result<VerifyResult> {
        let data = fs::read(file)?;
        self.verifier.verify(&data, signed_value)
    }
}
