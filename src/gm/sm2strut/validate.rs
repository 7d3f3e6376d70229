//! Verification of GB/T 35275 signed values.
//!
//! The checks run in a fixed order: decode, compare the recorded digest
//! with the content, resolve the signer's certificate, verify the SM2
//! signature. The first failing check decides the reported reason.

use super::{AttributeLayout, SignedData, SignerInfo};
use crate::error::{Error, Result};
use crate::gm::{cert, oids, sm2_verify, DigestAlgorithm};
use crate::signatures::{VerifyFailure, VerifyResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use der::asn1::OctetString;
use der::{Decode, Encode};
use log::{debug, warn};

/// Verifier for GB/T 35275 signed values.
///
/// The attribute layout is read from the wire: a signer carrying
/// authenticated attributes is verified as PKCS#9, otherwise as minimal.
/// Pinning a layout with [`Gbt35275Verifier::expect_layout`] turns a
/// mismatch into a failed verification.
#[derive(Debug, Clone, Default)]
pub struct Gbt35275Verifier {
    expected_layout: Option<AttributeLayout>,
}

impl Gbt35275Verifier {
    /// Create a verifier accepting either layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept signed values in `layout`.
    pub fn expect_layout(mut self, layout: AttributeLayout) -> Self {
        self.expected_layout = Some(layout);
        self
    }

    /// Verify `signed_value` against the current bytes of the signed content.
    ///
    /// Every `SignerInfo` must pass; the first failing signer decides the
    /// reported reason. Returns `Err` only when the signed value cannot be
    /// decoded or uses an unsupported algorithm.
    pub fn verify(&self, data: &[u8], signed_value: &[u8]) -> Result<VerifyResult> {
        let sd = SignedData::from_signed_value(signed_value)?;
        if sd.signer_infos.is_empty() {
            return Err(Error::Security("SignedData has no signer".to_string()));
        }
        for (index, signer) in sd.signer_infos.iter().enumerate() {
            let result = self.verify_signer(&sd, signer, data)?;
            if !result.passed {
                debug!("Signer {} of {} failed", index + 1, sd.signer_infos.len());
                return Ok(result);
            }
        }
        debug!("GB/T 35275 signed value verified ({} signers)", sd.signer_infos.len());
        Ok(VerifyResult::pass())
    }

    fn verify_signer(
        &self,
        sd: &SignedData,
        signer: &SignerInfo,
        data: &[u8],
    ) -> Result<VerifyResult> {
        let algorithm = DigestAlgorithm::from_oid(&signer.digest_algorithm.oid).ok_or_else(|| {
            Error::Security(format!(
                "Unsupported digest algorithm {}",
                signer.digest_algorithm.oid
            ))
        })?;
        let actual = algorithm.digest(data);

        let found = if signer.authenticated_attributes.is_some() {
            AttributeLayout::Pkcs9
        } else {
            AttributeLayout::Minimal
        };
        if let Some(expected) = self.expected_layout {
            if expected != found {
                warn!("Signed value layout is {}, expected {}", found.name(), expected.name());
                return Ok(VerifyResult::fail(VerifyFailure::UnexpectedLayout {
                    expected: expected.name(),
                    found: found.name(),
                }));
            }
        }

        let plaintext = match found {
            AttributeLayout::Minimal => {
                let plaintext = sd.content_info.plaintext()?.ok_or_else(|| {
                    Error::Security("Signed value carries no digest".to_string())
                })?;
                if !digest_matches(&plaintext, &actual) {
                    warn!("Digest mismatch: signed content changed");
                    return Ok(VerifyResult::fail(VerifyFailure::ContentChanged));
                }
                Some(plaintext)
            }
            AttributeLayout::Pkcs9 => {
                let attr = signer.attribute(&oids::PKCS9_MESSAGE_DIGEST).ok_or_else(|| {
                    Error::Security("Signer attributes lack messageDigest".to_string())
                })?;
                let recorded = OctetString::from_der(&attr.to_der()?)?;
                if recorded.as_bytes() != actual.as_slice() {
                    warn!("messageDigest mismatch: signed content changed");
                    return Ok(VerifyResult::fail(VerifyFailure::ContentChanged));
                }
                None
            }
        };

        let certificate = match sd.find_certificate(signer) {
            Some(c) => c,
            None => {
                warn!("No certificate matches signer {}", signer.issuer_and_serial_number.issuer);
                return Ok(VerifyResult::fail(VerifyFailure::NoMatchingCertificate));
            }
        };
        let public_key = cert::public_key(certificate)?;
        let signed = signer.signed_bytes(plaintext.as_deref())?;

        match sm2_verify(&public_key, &signed, signer.encrypted_digest.as_bytes()) {
            Ok(true) => Ok(VerifyResult::pass()),
            Ok(false) => Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch)),
            Err(e) => {
                debug!("Unreadable signature value: {}", e);
                Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch))
            }
        }
    }
}

/// Compare a recorded plaintext digest with a fresh one, accepting the
/// Base64 text form some producers embed.
fn digest_matches(recorded: &[u8], actual: &[u8]) -> bool {
    if recorded == actual {
        return true;
    }
    match STANDARD.decode(recorded) {
        Ok(decoded) => decoded == actual,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gm::cert::generate_self_signed;
    use crate::gm::sm2strut::SignedDataBuilder;
    use der::asn1::SetOfVec;
    use rand_core::OsRng;
    use x509_cert::serial_number::SerialNumber;
    use std::time::Duration;

    fn builder(serial: u8) -> SignedDataBuilder {
        let key = sm2::SecretKey::random(&mut OsRng);
        let cert =
            generate_self_signed(&key, "CN=Verifier Test", &[serial], Duration::from_secs(600))
                .unwrap();
        SignedDataBuilder::new(key, cert)
    }

    #[test]
    fn test_minimal_sign_verify() {
        let sv = builder(1).sign(b"manifest").unwrap().to_signed_value().unwrap();
        let r = Gbt35275Verifier::new().verify(b"manifest", &sv).unwrap();
        assert!(r.passed, "{:?}", r);
    }

    #[test]
    fn test_pkcs9_sign_verify() {
        let sv = builder(1)
            .with_layout(AttributeLayout::Pkcs9)
            .sign(b"manifest")
            .unwrap()
            .to_signed_value()
            .unwrap();
        let r = Gbt35275Verifier::new().verify(b"manifest", &sv).unwrap();
        assert!(r.passed, "{:?}", r);
    }

    #[test]
    fn test_base64_digest_verifies() {
        let sv = builder(1)
            .with_base64_digest(true)
            .sign(b"manifest")
            .unwrap()
            .to_signed_value()
            .unwrap();
        assert!(Gbt35275Verifier::new().verify(b"manifest", &sv).unwrap().passed);
    }

    #[test]
    fn test_content_changed() {
        for layout in [AttributeLayout::Minimal, AttributeLayout::Pkcs9] {
            let sv = builder(1).with_layout(layout).sign(b"manifest").unwrap();
            let sv = sv.to_signed_value().unwrap();
            let r = Gbt35275Verifier::new().verify(b"manifesT", &sv).unwrap();
            assert_eq!(r.failure, Some(VerifyFailure::ContentChanged));
        }
    }

    #[test]
    fn test_no_matching_certificate() {
        let mut sd = builder(1).sign(b"data").unwrap();
        let other = builder(2).sign(b"data").unwrap();
        sd.certificates = other.certificates;
        let r = Gbt35275Verifier::new().verify(b"data", &sd.to_signed_value().unwrap()).unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::NoMatchingCertificate));
    }

    #[test]
    fn test_signature_mismatch() {
        let mut sd = builder(1).sign(b"data").unwrap();
        let other = builder(1).sign(b"data").unwrap();
        // Same issuer and serial, different key pair.
        sd.certificates = other.certificates;
        let r = Gbt35275Verifier::new().verify(b"data", &sd.to_signed_value().unwrap()).unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::SignatureMismatch));
    }

    fn with_extra_signer(
        sd: &mut SignedData,
        edit: impl FnOnce(&mut SignerInfo),
    ) {
        let genuine = sd.signer_infos.iter().next().unwrap().clone();
        let mut extra = genuine.clone();
        edit(&mut extra);
        sd.signer_infos = SetOfVec::try_from(vec![genuine, extra]).unwrap();
    }

    #[test]
    fn test_every_signer_needs_a_certificate() {
        let mut sd = builder(1).sign(b"hello").unwrap();
        with_extra_signer(&mut sd, |extra| {
            extra.issuer_and_serial_number.serial_number =
                SerialNumber::new(&[0x7f, 0x7e]).unwrap();
        });
        assert_eq!(sd.signer_infos.len(), 2);
        let r = Gbt35275Verifier::new().verify(b"hello", &sd.to_signed_value().unwrap()).unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::NoMatchingCertificate));
    }

    #[test]
    fn test_every_signer_signature_checked() {
        let mut sd = builder(1).sign(b"hello").unwrap();
        with_extra_signer(&mut sd, |extra| {
            let mut forged = extra.encrypted_digest.as_bytes().to_vec();
            let last = forged.len() - 1;
            forged[last] ^= 0x01;
            extra.encrypted_digest = OctetString::new(forged).unwrap();
        });
        assert_eq!(sd.signer_infos.len(), 2);
        let r = Gbt35275Verifier::new().verify(b"hello", &sd.to_signed_value().unwrap()).unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::SignatureMismatch));
    }

    #[test]
    fn test_no_signers_rejected() {
        let mut sd = builder(1).sign(b"hello").unwrap();
        sd.signer_infos = SetOfVec::new();
        assert!(matches!(
            Gbt35275Verifier::new().verify(b"hello", &sd.to_signed_value().unwrap()),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn test_pinned_layout_mismatch() {
        let sv = builder(1).sign(b"data").unwrap().to_signed_value().unwrap();
        let r = Gbt35275Verifier::new()
            .expect_layout(AttributeLayout::Pkcs9)
            .verify(b"data", &sv)
            .unwrap();
        assert!(matches!(r.failure, Some(VerifyFailure::UnexpectedLayout { .. })));
    }

    #[test]
    fn test_bare_signed_data_accepted() {
        let bare = builder(1).sign(b"data").unwrap().to_der().unwrap();
        assert!(Gbt35275Verifier::new().verify(b"data", &bare).unwrap().passed);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            Gbt35275Verifier::new().verify(b"data", b"\x30\x02\x05"),
            Err(Error::Decode(_))
        ));
    }
}
