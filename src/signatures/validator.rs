//! Validation of signed documents.
//!
//! For every signature in the document's list the checks run in order:
//! referenced file digests, seal consistency, then the signed value itself.
//! The first failing check decides the reported reason for that signature;
//! all signatures are always checked. A record, signed value or seal file
//! that is gone is reported as a missing reference for its signature only.

use super::document::OfdDocument;
use super::records::SignatureRecord;
use super::types::{SigType, VerifyFailure, VerifyResult};
use crate::error::{Error, Result};
use crate::gm::ses::{signature_version, v1, v4, SesVersion};
use crate::gm::sm2strut::{AttributeLayout, Gbt35275Verifier};
use crate::gm::{sm2_verify, sm3, DigestAlgorithm};
use crate::package::{resolve_loc, Workspace};
use crate::signatures::SignatureList;
use der::{Decode, Encode};
use log::{debug, info, warn};
use std::fmt;
use std::path::Path;

/// Checks a signed value against the bytes of `Signature.xml`.
pub trait SignedDataValidator {
    /// Validate `signed_value` over `tbs_content`.
    fn validate(
        &self,
        sig_type: SigType,
        signature_method: &str,
        tbs_content: &[u8],
        signed_value: &[u8],
    ) -> Result<VerifyResult>;
}

/// Validator for GB/T 35275 signatures.
#[derive(Debug, Clone, Default)]
pub struct Gbt35275Validator {
    verifier: Gbt35275Verifier,
}

impl Gbt35275Validator {
    /// Accept either attribute layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept `layout`.
    pub fn expect_layout(mut self, layout: AttributeLayout) -> Self {
        self.verifier = self.verifier.expect_layout(layout);
        self
    }
}

impl SignedDataValidator for Gbt35275Validator {
    fn validate(
        &self,
        sig_type: SigType,
        _signature_method: &str,
        tbs_content: &[u8],
        signed_value: &[u8],
    ) -> Result<VerifyResult> {
        if sig_type != SigType::Sign {
            return Err(Error::InvalidArgument(
                "GB/T 35275 validation applies to Sign signatures only".to_string(),
            ));
        }
        self.verifier.verify(tbs_content, signed_value)
    }
}

/// Validator for electronic seal signatures, v1 and v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct SesValidator;

impl SesValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }
}

impl SignedDataValidator for SesValidator {
    fn validate(
        &self,
        sig_type: SigType,
        _signature_method: &str,
        tbs_content: &[u8],
        signed_value: &[u8],
    ) -> Result<VerifyResult> {
        if sig_type != SigType::Seal {
            return Err(Error::InvalidArgument(
                "Seal validation applies to Seal signatures only".to_string(),
            ));
        }
        let actual = sm3(tbs_content);
        let (data_hash, verified) = match signature_version(signed_value)? {
            SesVersion::V1 => {
                let sig = v1::SesSignature::from_der(signed_value)?;
                let hash = sig.to_sign.data_hash.raw_bytes().to_vec();
                (hash, sig.verify_signature()?)
            }
            SesVersion::V4 => {
                let sig = v4::SesSignature::from_der(signed_value)?;
                let hash = sig.to_sign.data_hash.raw_bytes().to_vec();
                (hash, sig.verify_signature()?)
            }
        };
        if data_hash != actual {
            return Ok(VerifyResult::fail(VerifyFailure::ContentChanged));
        }
        if !verified {
            return Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch));
        }
        Ok(VerifyResult::pass())
    }
}

/// Validator for bare SM2 signatures made with a known key.
#[derive(Debug, Clone)]
pub struct DigitalValidator {
    public_key: sm2::PublicKey,
}

impl DigitalValidator {
    /// Verify against `public_key`.
    pub fn new(public_key: sm2::PublicKey) -> Self {
        Self { public_key }
    }
}

impl SignedDataValidator for DigitalValidator {
    fn validate(
        &self,
        _sig_type: SigType,
        _signature_method: &str,
        tbs_content: &[u8],
        signed_value: &[u8],
    ) -> Result<VerifyResult> {
        if sm2_verify(&self.public_key, tbs_content, signed_value)? {
            Ok(VerifyResult::pass())
        } else {
            Ok(VerifyResult::fail(VerifyFailure::SignatureMismatch))
        }
    }
}

/// Outcome for one signature of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCheck {
    /// Signature ID
    pub id: String,
    /// Seal or plain signature
    pub sig_type: SigType,
    /// Verification outcome
    pub result: VerifyResult,
}

/// Outcome of validating every signature of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Per-signature outcomes in list order
    pub checks: Vec<SignatureCheck>,
}

impl ValidationReport {
    /// Whether every signature verified.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.result.passed)
    }

    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &SignatureCheck> {
        self.checks.iter().filter(|c| !c.result.passed)
    }
}

/// Validates every signature of an OFD document.
pub struct OfdValidator {
    validator: Box<dyn SignedDataValidator>,
}

impl fmt::Debug for OfdValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfdValidator").finish_non_exhaustive()
    }
}

impl OfdValidator {
    /// Validate signed values with `validator`.
    pub fn new(validator: impl SignedDataValidator + 'static) -> Self {
        Self {
            validator: Box::new(validator),
        }
    }

    /// Validate the signatures of `ofd_file`.
    pub fn validate(&self, ofd_file: impl AsRef<Path>) -> Result<ValidationReport> {
        let workspace = Workspace::unpack(ofd_file.as_ref())?;
        self.validate_workspace(&workspace)
    }

    /// Validate the signatures of an unpacked package.
    pub fn validate_workspace(&self, workspace: &Workspace) -> Result<ValidationReport> {
        let document = OfdDocument::load(workspace)?;
        let signatures_loc = document
            .signatures_loc()
            .ok_or_else(|| Error::ProtocolState("Document is not signed".to_string()))?;
        let list = SignatureList::parse(&workspace.read_file(signatures_loc)?)?;

        let mut report = ValidationReport::default();
        for entry in list.entries {
            let loc = resolve_loc(signatures_loc, &entry.base_loc);
            let result = if workspace.exists(&loc) {
                let record = SignatureRecord::parse(&workspace.read_file(&loc)?)?;
                self.check_signature(workspace, entry.sig_type, &loc, &record)?
            } else {
                VerifyResult::fail(VerifyFailure::MissingReference(loc))
            };
            match &result.failure {
                Some(failure) => warn!("Signature {} failed: {}", entry.id, failure),
                None => debug!("Signature {} verified", entry.id),
            }
            report.checks.push(SignatureCheck {
                id: entry.id,
                sig_type: entry.sig_type,
                result,
            });
        }
        info!(
            "Validated {} signatures, {} failed",
            report.checks.len(),
            report.failures().count()
        );
        Ok(report)
    }

    fn check_signature(
        &self,
        workspace: &Workspace,
        sig_type: SigType,
        signature_loc: &str,
        record: &SignatureRecord,
    ) -> Result<VerifyResult> {
        let result = check_references(workspace, record)?;
        if !result.passed {
            return Ok(result);
        }

        let signed_value_loc = resolve_loc(signature_loc, &record.signed_value_loc);
        if !workspace.exists(&signed_value_loc) {
            return Ok(VerifyResult::fail(VerifyFailure::MissingReference(
                signed_value_loc,
            )));
        }
        let signed_value = workspace.read_file(&signed_value_loc)?;

        if sig_type == SigType::Seal {
            if let Some(seal_loc) = &record.signed_info.seal_loc {
                let seal_loc = resolve_loc(signature_loc, seal_loc);
                if !workspace.exists(&seal_loc) {
                    return Ok(VerifyResult::fail(VerifyFailure::MissingReference(seal_loc)));
                }
                let seal = workspace.read_file(&seal_loc)?;
                if embedded_seal(&signed_value)? != seal {
                    return Ok(VerifyResult::fail(VerifyFailure::SealMismatch));
                }
            }
        }

        self.validator.validate(
            sig_type,
            &record.signed_info.signature_method,
            &workspace.read_file(signature_loc)?,
            &signed_value,
        )
    }
}

fn check_method(name: &str) -> Result<DigestAlgorithm> {
    if name.eq_ignore_ascii_case("SM3") {
        return Ok(DigestAlgorithm::Sm3);
    }
    name.parse()
        .ok()
        .and_then(|oid| DigestAlgorithm::from_oid(&oid))
        .ok_or_else(|| Error::Security(format!("Unsupported CheckMethod '{}'", name)))
}

fn check_references(workspace: &Workspace, record: &SignatureRecord) -> Result<VerifyResult> {
    let algorithm = check_method(&record.signed_info.check_method)?;
    for reference in &record.signed_info.references {
        if !workspace.exists(&reference.file_ref) {
            return Ok(VerifyResult::fail(VerifyFailure::MissingReference(
                reference.file_ref.clone(),
            )));
        }
        let actual = algorithm.digest(&workspace.read_file(&reference.file_ref)?);
        if actual != reference.check_value {
            debug!("Digest of {} changed", reference.file_ref);
            return Ok(VerifyResult::fail(VerifyFailure::ReferenceMismatch(
                reference.file_ref.clone(),
            )));
        }
    }
    Ok(VerifyResult::pass())
}

/// DER of the seal embedded in a seal signature.
fn embedded_seal(signed_value: &[u8]) -> Result<Vec<u8>> {
    let der = match signature_version(signed_value)? {
        SesVersion::V1 => v1::SesSignature::from_der(signed_value)?.to_sign.eseal.to_der()?,
        SesVersion::V4 => v4::SesSignature::from_der(signed_value)?.to_sign.eseal.to_der()?,
    };
    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gm::oids;
    use rand_core::OsRng;

    #[test]
    fn test_check_method_names() {
        assert_eq!(check_method("SM3").unwrap(), DigestAlgorithm::Sm3);
        assert_eq!(check_method(&oids::SM3.to_string()).unwrap(), DigestAlgorithm::Sm3);
        assert!(matches!(check_method("SHA-1"), Err(Error::Security(_))));
    }

    #[test]
    fn test_digital_validator() {
        let key = sm2::SecretKey::random(&mut OsRng);
        let sig = crate::gm::sm2_sign(&key, b"tbs").unwrap();
        let validator = DigitalValidator::new(key.public_key());
        assert!(validator.validate(SigType::Sign, "", b"tbs", &sig).unwrap().passed);
        let r = validator.validate(SigType::Sign, "", b"tbs!", &sig).unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::SignatureMismatch));
    }

    #[test]
    fn test_type_mismatch_is_error() {
        assert!(matches!(
            Gbt35275Validator::new().validate(SigType::Seal, "", b"", b""),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            SesValidator::new().validate(SigType::Sign, "", b"", b""),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ses_validator_detects_content_change() {
        use crate::signatures::container::{SesV1Container, SignatureContainer};
        let (key, cert, seal) = crate::gm::ses::v1::tests::sample_seal();
        let sv = SesV1Container::new(key, seal.clone(), cert)
            .sign(b"<ofd:Signature/>", "p")
            .unwrap();
        let validator = SesValidator::new();
        assert!(validator
            .validate(SigType::Seal, "", b"<ofd:Signature/>", &sv)
            .unwrap()
            .passed);
        let r = validator
            .validate(SigType::Seal, "", b"<ofd:Signature ID=\"x\"/>", &sv)
            .unwrap();
        assert_eq!(r.failure, Some(VerifyFailure::ContentChanged));
        assert_eq!(embedded_seal(&sv).unwrap(), seal.to_der().unwrap());
    }
}
