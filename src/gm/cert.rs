//! Certificate and key handling.
//!
//! Loaders accept PEM or DER. [`generate_self_signed`] builds an SM2/SM3
//! X.509 v3 certificate, which is what seal makers and tests need when no
//! issuing CA is at hand.

use super::{oids, sm2_sign};
use crate::error::{Error, Result};
use der::asn1::BitString;
use der::{Decode, DecodePem, Encode};
use log::debug;
use pkcs8::{DecodePrivateKey, EncodePublicKey};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::str::FromStr;
use std::time::Duration;
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Validity;

/// Load one certificate from PEM or DER bytes.
pub fn load_certificate(data: &[u8]) -> Result<Certificate> {
    if looks_like_pem(data) {
        Ok(Certificate::from_pem(data)?)
    } else {
        Ok(Certificate::from_der(data)?)
    }
}

/// Load every certificate in a PEM bundle, in file order.
pub fn load_certificate_chain(pem: &[u8]) -> Result<Vec<Certificate>> {
    let certs = Certificate::load_pem_chain(pem)?;
    if certs.is_empty() {
        return Err(Error::InvalidArgument("PEM bundle holds no certificates".to_string()));
    }
    Ok(certs)
}

/// Load an SM2 private key from PKCS#8 (PEM or DER) or SEC1 DER.
pub fn load_private_key(data: &[u8]) -> Result<sm2::SecretKey> {
    if looks_like_pem(data) {
        let pem = std::str::from_utf8(data)
            .map_err(|_| Error::Security("Private key PEM is not UTF-8".to_string()))?;
        return sm2::SecretKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::Security(format!("Unusable PKCS#8 private key: {}", e)));
    }
    match sm2::SecretKey::from_pkcs8_der(data) {
        Ok(key) => Ok(key),
        Err(_) => sm2::SecretKey::from_sec1_der(data)
            .map_err(|e| Error::Security(format!("Unusable private key: {}", e))),
    }
}

fn looks_like_pem(data: &[u8]) -> bool {
    let trimmed = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &data[i..])
        .unwrap_or(&[]);
    trimmed.starts_with(b"-----BEGIN")
}

/// Extract the SM2 public key of a certificate.
pub fn public_key(cert: &Certificate) -> Result<sm2::PublicKey> {
    let spki = &cert.tbs_certificate.subject_public_key_info;
    sm2::PublicKey::from_sec1_bytes(spki.subject_public_key.raw_bytes()).map_err(|_| {
        Error::Security(format!(
            "Certificate {} does not carry an SM2 public key (algorithm {})",
            cert.tbs_certificate.subject, spki.algorithm.oid
        ))
    })
}

/// Build a self-signed SM2/SM3 certificate.
///
/// `subject` is an RFC 4514 string such as `CN=Seal,O=ACME,C=CN`.
pub fn generate_self_signed(
    key: &sm2::SecretKey,
    subject: &str,
    serial: &[u8],
    validity: Duration,
) -> Result<Certificate> {
    let name = Name::from_str(subject)?;
    let spki_der = key
        .public_key()
        .to_public_key_der()
        .map_err(|e| Error::Security(format!("Cannot encode SM2 public key: {}", e)))?;
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes())?;
    let algorithm = AlgorithmIdentifierOwned {
        oid: oids::SM2_WITH_SM3,
        parameters: None,
    };

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(serial)?,
        signature: algorithm.clone(),
        issuer: name.clone(),
        validity: Validity::from_now(validity)?,
        subject: name,
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    let signature = sm2_sign(key, &tbs.to_der()?)?;
    debug!("Generated self-signed SM2 certificate for {}", subject);

    Ok(Certificate {
        tbs_certificate: tbs,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature)?,
    })
}
