//! Signing containers.
//!
//! A container decides what a signed value looks like on the wire. The
//! signer hands it the bytes of `Signature.xml` and stores whatever comes
//! back in `SignedValue.dat`; seal containers also hand out the seal that
//! goes to `Seal.esl`.

use super::types::SigType;
use crate::error::{Error, Result};
use crate::gm::ses::{v1, v4};
use crate::gm::sm2strut::{AttributeLayout, SignedDataBuilder};
use crate::gm::{oids, sm2_sign, DigestAlgorithm};
use der::asn1::{BitString, GeneralizedTime, Ia5String, ObjectIdentifier, OctetString};
use der::Encode;
use log::debug;
use std::fmt;
use std::time::SystemTime;
use x509_cert::Certificate;

/// Produces signed values for the document signer.
pub trait SignatureContainer {
    /// Digest used for `CheckValue` of every reference.
    fn digest_algorithm(&self) -> DigestAlgorithm;

    /// Algorithm written to `SignatureMethod`.
    fn signature_algorithm(&self) -> ObjectIdentifier;

    /// Sign the bytes of `Signature.xml`.
    fn sign(&self, data: &[u8], property_info: &str) -> Result<Vec<u8>>;

    /// Encoded seal, for seal containers.
    fn seal(&self) -> Result<Option<Vec<u8>>>;

    /// Kind of signature produced.
    fn kind(&self) -> SigType;
}

/// Called with the raw signature value; a returned token is embedded as
/// the v4 `timeStamp`.
pub trait TimestampHook {
    /// Obtain a timestamp token over `signature`.
    fn apply(&self, signature: &[u8]) -> Result<Option<Vec<u8>>>;
}

impl<F> TimestampHook for F
where
    F: Fn(&[u8]) -> Option<Vec<u8>>,
{
    fn apply(&self, signature: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self(signature))
    }
}

fn ia5(property_info: &str) -> Result<Ia5String> {
    Ia5String::new(property_info).map_err(|_| {
        Error::InvalidArgument(format!(
            "Property info must be ASCII: '{}'",
            property_info
        ))
    })
}

/// Bare SM2 signature over the content, no envelope.
#[derive(Clone)]
pub struct DigitalSignContainer {
    key: sm2::SecretKey,
}

impl DigitalSignContainer {
    /// Sign with `key`.
    pub fn new(key: sm2::SecretKey) -> Self {
        Self { key }
    }
}

impl fmt::Debug for DigitalSignContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalSignContainer")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SignatureContainer for DigitalSignContainer {
    fn digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sm3
    }

    fn signature_algorithm(&self) -> ObjectIdentifier {
        oids::SM2_WITH_SM3
    }

    fn sign(&self, data: &[u8], _property_info: &str) -> Result<Vec<u8>> {
        sm2_sign(&self.key, data)
    }

    fn seal(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn kind(&self) -> SigType {
        SigType::Sign
    }
}

/// GB/T 35275 `ContentInfo(SignedData)` signatures.
#[derive(Debug, Clone)]
pub struct Gbt35275Container {
    builder: SignedDataBuilder,
}

impl Gbt35275Container {
    /// Minimal layout: the SM3 digest travels as plaintext and is signed directly.
    pub fn new(key: sm2::SecretKey, certificate: Certificate) -> Self {
        Self {
            builder: SignedDataBuilder::new(key, certificate),
        }
    }

    /// PKCS#9 layout: the signature covers authenticated attributes.
    pub fn pkcs9(key: sm2::SecretKey, certificate: Certificate) -> Self {
        Self::new(key, certificate).with_layout(AttributeLayout::Pkcs9)
    }

    /// Select the attribute layout.
    pub fn with_layout(mut self, layout: AttributeLayout) -> Self {
        self.builder = self.builder.with_layout(layout);
        self
    }

    /// Embed the Base64 text of the digest instead of the raw digest.
    pub fn with_base64_digest(mut self, enabled: bool) -> Self {
        self.builder = self.builder.with_base64_digest(enabled);
        self
    }

    /// Attribute layout of produced signatures.
    pub fn layout(&self) -> AttributeLayout {
        self.builder.layout()
    }
}

impl SignatureContainer for Gbt35275Container {
    fn digest_algorithm(&self) -> DigestAlgorithm {
        self.builder.digest_algorithm()
    }

    fn signature_algorithm(&self) -> ObjectIdentifier {
        oids::SM2_WITH_SM3
    }

    fn sign(&self, data: &[u8], _property_info: &str) -> Result<Vec<u8>> {
        self.builder.sign(data)?.to_signed_value()
    }

    fn seal(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn kind(&self) -> SigType {
        SigType::Sign
    }
}

/// GM/T 0031-2014 seal signatures.
#[derive(Clone)]
pub struct SesV1Container {
    key: sm2::SecretKey,
    seal: v1::SeSeal,
    certificate: Certificate,
}

impl SesV1Container {
    /// Sign with `key` under `seal`; `certificate` identifies the signer.
    pub fn new(key: sm2::SecretKey, seal: v1::SeSeal, certificate: Certificate) -> Self {
        Self {
            key,
            seal,
            certificate,
        }
    }
}

impl fmt::Debug for SesV1Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SesV1Container")
            .field("key", &"[REDACTED]")
            .field("seal", &self.seal.seal_info.es_id)
            .finish()
    }
}

impl SignatureContainer for SesV1Container {
    fn digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sm3
    }

    fn signature_algorithm(&self) -> ObjectIdentifier {
        oids::SM2_WITH_SM3
    }

    fn sign(&self, data: &[u8], property_info: &str) -> Result<Vec<u8>> {
        let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let tbs = v1::TbsSign {
            version: 1,
            eseal: self.seal.clone(),
            time_info: BitString::from_bytes(time.as_bytes())?,
            data_hash: BitString::from_bytes(&self.digest_algorithm().digest(data))?,
            property_info: ia5(property_info)?,
            cert: OctetString::new(self.certificate.to_der()?)?,
            signature_algorithm: oids::SM2_WITH_SM3,
        };
        let signature = v1::SesSignature::sign(tbs, &self.key)?;
        Ok(signature.to_der()?)
    }

    fn seal(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.seal.to_der()?))
    }

    fn kind(&self) -> SigType {
        SigType::Seal
    }
}

/// GB/T 38540-2020 seal signatures with optional timestamping.
pub struct SesV4Container {
    key: sm2::SecretKey,
    seal: v4::SeSeal,
    certificate: Certificate,
    timestamp_hook: Option<Box<dyn TimestampHook>>,
}

impl SesV4Container {
    /// Sign with `key` under `seal`; `certificate` identifies the signer.
    pub fn new(key: sm2::SecretKey, seal: v4::SeSeal, certificate: Certificate) -> Self {
        Self {
            key,
            seal,
            certificate,
            timestamp_hook: None,
        }
    }

    /// Timestamp every signature value with `hook`.
    pub fn with_timestamp_hook(mut self, hook: impl TimestampHook + 'static) -> Self {
        self.timestamp_hook = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for SesV4Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SesV4Container")
            .field("key", &"[REDACTED]")
            .field("seal", &self.seal.seal_info.es_id)
            .field("timestamp_hook", &self.timestamp_hook.is_some())
            .finish()
    }
}

impl SignatureContainer for SesV4Container {
    fn digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::Sm3
    }

    fn signature_algorithm(&self) -> ObjectIdentifier {
        oids::SM2_WITH_SM3
    }

    fn sign(&self, data: &[u8], property_info: &str) -> Result<Vec<u8>> {
        let tbs = v4::TbsSign {
            version: 4,
            eseal: self.seal.clone(),
            time_info: GeneralizedTime::from_system_time(SystemTime::now())?,
            data_hash: BitString::from_bytes(&self.digest_algorithm().digest(data))?,
            property_info: ia5(property_info)?,
            ext_datas: None,
        };
        let mut signature = v4::SesSignature::sign(tbs, &self.key, &self.certificate)?;

        if let Some(hook) = &self.timestamp_hook {
            if let Some(token) = hook.apply(signature.signature.raw_bytes())? {
                debug!("Embedding {} byte timestamp token", token.len());
                signature.time_stamp = Some(BitString::from_bytes(&token)?);
            }
        }
        Ok(signature.to_der()?)
    }

    fn seal(&self) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.seal.to_der()?))
    }

    fn kind(&self) -> SigType {
        SigType::Seal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gm::cert::generate_self_signed;
    use crate::gm::ses::{signature_version, SesVersion};
    use crate::gm::sm2strut::Gbt35275Verifier;
    use crate::gm::sm2_verify;
    use der::Decode;
    use rand_core::OsRng;
    use std::time::Duration;

    fn key_cert(cn: &str) -> (sm2::SecretKey, Certificate) {
        let key = sm2::SecretKey::random(&mut OsRng);
        let cert = generate_self_signed(&key, cn, &[3], Duration::from_secs(600)).unwrap();
        (key, cert)
    }

    #[test]
    fn test_digital_container() {
        let (key, _) = key_cert("CN=Digital");
        let public = key.public_key();
        let container = DigitalSignContainer::new(key);
        let sig = container.sign(b"Signature.xml", "").unwrap();
        assert!(sm2_verify(&public, b"Signature.xml", &sig).unwrap());
        assert_eq!(container.kind(), SigType::Sign);
        assert!(container.seal().unwrap().is_none());
    }

    #[test]
    fn test_gbt35275_container_verifies() {
        let (key, cert) = key_cert("CN=Signer");
        for container in [
            Gbt35275Container::new(key.clone(), cert.clone()),
            Gbt35275Container::pkcs9(key.clone(), cert.clone()),
        ] {
            let sv = container.sign(b"<ofd:Signature/>", "ignored").unwrap();
            let result = Gbt35275Verifier::new()
                .expect_layout(container.layout())
                .verify(b"<ofd:Signature/>", &sv)
                .unwrap();
            assert!(result.passed);
        }
    }

    #[test]
    fn test_non_ascii_property_info_rejected() {
        let key = sm2::SecretKey::random(&mut OsRng);
        let (_, cert, seal) = crate::gm::ses::v1::tests::sample_seal();
        let container = SesV1Container::new(key, seal, cert);
        assert!(matches!(
            container.sign(b"x", "合同"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ses_v1_container() {
        let (key, cert, seal) = crate::gm::ses::v1::tests::sample_seal();
        let container = SesV1Container::new(key, seal.clone(), cert);
        let sv = container.sign(b"<ofd:Signature/>", "/Doc_0/Signs/Sign_0/Signature.xml").unwrap();
        assert_eq!(signature_version(&sv).unwrap(), SesVersion::V1);

        let decoded = v1::SesSignature::from_der(&sv).unwrap();
        assert!(decoded.verify_signature().unwrap());
        assert_eq!(decoded.to_sign.eseal, seal);
        assert_eq!(
            decoded.to_sign.data_hash.raw_bytes(),
            crate::gm::sm3(b"<ofd:Signature/>").as_slice()
        );
        assert_eq!(container.seal().unwrap().unwrap(), seal.to_der().unwrap());
    }

    #[test]
    fn test_ses_v4_container_timestamp_hook() {
        let (key, cert, seal) =
            crate::gm::ses::v4::tests::sample_seal(v4::CertList::Certs(Vec::new()));
        let container = SesV4Container::new(key.clone(), seal.clone(), cert.clone())
            .with_timestamp_hook(|sig: &[u8]| Some(crate::gm::sm3(sig)));
        let sv = container.sign(b"payload", "p").unwrap();

        let decoded = v4::SesSignature::from_der(&sv).unwrap();
        assert!(decoded.verify_signature().unwrap());
        let token = decoded.time_stamp.as_ref().unwrap();
        assert_eq!(
            token.raw_bytes(),
            crate::gm::sm3(decoded.signature.raw_bytes()).as_slice()
        );

        let plain = SesV4Container::new(key, seal, cert).sign(b"payload", "p").unwrap();
        assert!(v4::SesSignature::from_der(&plain).unwrap().time_stamp.is_none());
    }
}
