//! GB/T 35275 `SignedData` structures.
//!
//! GB/T 35275 borrows the PKCS#7 layout but uses GM object identifiers
//! throughout, so generic CMS decoders reject it. The types here are the
//! fixed layouts the standard requires:
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType   OBJECT IDENTIFIER,
//!     content       [0] EXPLICIT ANY OPTIONAL }
//!
//! SignedData ::= SEQUENCE {
//!     version             INTEGER,
//!     digestAlgorithms    SET OF AlgorithmIdentifier,
//!     contentInfo         ContentInfo,
//!     certificates        [0] IMPLICIT SET OF Certificate OPTIONAL,
//!     crls                [1] IMPLICIT SET OF CertificateList OPTIONAL,
//!     signerInfos         SET OF SignerInfo }
//!
//! SignerInfo ::= SEQUENCE {
//!     version                     INTEGER,
//!     issuerAndSerialNumber       IssuerAndSerialNumber,
//!     digestAlgorithm             AlgorithmIdentifier,
//!     authenticatedAttributes     [0] IMPLICIT SET OF Attribute OPTIONAL,
//!     digestEncryptionAlgorithm   AlgorithmIdentifier,
//!     encryptedDigest             OCTET STRING,
//!     unauthenticatedAttributes   [1] IMPLICIT SET OF Attribute OPTIONAL }
//! ```
//!
//! All encoding is DER, so equal values always encode to equal bytes.

mod builder;
mod validate;

pub use builder::{AttributeLayout, SignedDataBuilder};
pub use validate::Gbt35275Verifier;

use super::oids;
use crate::error::{Error, Result};
use core::cmp::Ordering;
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec};
use der::{Any, Decode, Encode, Enumerated, Sequence, ValueOrd};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;
use x509_cert::crl::CertificateList;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

/// Structure version. GB/T 35275 fixes it at 1 for both `SignedData`
/// and `SignerInfo`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub enum StructVersion {
    /// version 1
    V1 = 1,
}

impl ValueOrd for StructVersion {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        (*self as u8).value_cmp(&(*other as u8))
    }
}

/// Tagged `(contentType, content)` pair.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ContentInfo {
    /// Content type OID
    pub content_type: ObjectIdentifier,
    /// Payload, absent for detached content
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub content: Option<Any>,
}

impl ContentInfo {
    /// Wrap a plaintext as `data` content.
    pub fn data(plaintext: &[u8]) -> Result<Self> {
        let octets = OctetString::new(plaintext)?;
        Ok(Self {
            content_type: oids::GBT_DATA,
            content: Some(Any::encode_from(&octets)?),
        })
    }

    /// `data` content with no payload.
    pub fn detached() -> Self {
        Self {
            content_type: oids::GBT_DATA,
            content: None,
        }
    }

    /// Wrap a `SignedData` as the outer envelope.
    pub fn signed_data(sd: &SignedData) -> Result<Self> {
        Ok(Self {
            content_type: oids::GBT_SIGNED_DATA,
            content: Some(Any::encode_from(sd)?),
        })
    }

    /// Plaintext bytes carried by a `data` content, if any.
    pub fn plaintext(&self) -> Result<Option<Vec<u8>>> {
        match &self.content {
            None => Ok(None),
            Some(any) => {
                let octets = OctetString::from_der(&any.to_der()?)?;
                Ok(Some(octets.as_bytes().to_vec()))
            }
        }
    }
}

/// `IssuerAndSerialNumber`: a certificate reference by issuer DN and serial.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct IssuerAndSerialNumber {
    /// Issuer distinguished name
    pub issuer: Name,
    /// Certificate serial number
    pub serial_number: SerialNumber,
}

impl IssuerAndSerialNumber {
    /// Reference a certificate.
    pub fn from_certificate(cert: &Certificate) -> Self {
        Self {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        }
    }

    /// Whether `cert` is the certificate this value names.
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.issuer == cert.tbs_certificate.issuer
            && self.serial_number == cert.tbs_certificate.serial_number
    }
}

/// Per-signer information.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct SignerInfo {
    /// Always [`StructVersion::V1`]
    pub version: StructVersion,
    /// Signing certificate reference
    pub issuer_and_serial_number: IssuerAndSerialNumber,
    /// Digest algorithm (SM3)
    pub digest_algorithm: AlgorithmIdentifierOwned,
    /// Signed attributes; when present the signature covers their DER
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub authenticated_attributes: Option<Attributes>,
    /// Signature algorithm (SM2)
    pub digest_encryption_algorithm: AlgorithmIdentifierOwned,
    /// Signature value
    pub encrypted_digest: OctetString,
    /// Unsigned attributes
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub unauthenticated_attributes: Option<Attributes>,
}

impl SignerInfo {
    /// Bytes the signature covers: the DER of the attribute SET when
    /// attributes are present, otherwise `plaintext`.
    ///
    /// The `[0] IMPLICIT` tag is replaced by the universal SET tag before
    /// signing, as PKCS#9 prescribes.
    pub fn signed_bytes(&self, plaintext: Option<&[u8]>) -> Result<Vec<u8>> {
        match &self.authenticated_attributes {
            Some(attrs) => Ok(attrs.to_der()?),
            None => plaintext.map(<[u8]>::to_vec).ok_or_else(|| {
                Error::Security("Signer has no attributes and no content to verify".to_string())
            }),
        }
    }

    /// Look up an authenticated attribute's first value.
    pub fn attribute(&self, oid: &ObjectIdentifier) -> Option<&Any> {
        self.authenticated_attributes
            .as_ref()?
            .iter()
            .find(|a| a.oid == *oid)
            .and_then(|a| a.values.iter().next())
    }
}

/// GB/T 35275 signed data.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignedData {
    /// Always [`StructVersion::V1`]
    pub version: StructVersion,
    /// Digest algorithms used by the signers
    pub digest_algorithms: SetOfVec<AlgorithmIdentifierOwned>,
    /// Signed content, possibly detached
    pub content_info: ContentInfo,
    /// Certificates needed to verify the signers
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub certificates: Option<SetOfVec<Certificate>>,
    /// Revocation lists
    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub crls: Option<SetOfVec<CertificateList>>,
    /// One entry per signer
    pub signer_infos: SetOfVec<SignerInfo>,
}

impl SignedData {
    /// Certificate referenced by `signer`, if embedded.
    pub fn find_certificate(&self, signer: &SignerInfo) -> Option<&Certificate> {
        self.certificates
            .as_ref()?
            .iter()
            .find(|c| signer.issuer_and_serial_number.matches(c))
    }

    /// Decode either an outer `ContentInfo(signedData)` or a bare `SignedData`.
    pub fn from_signed_value(bytes: &[u8]) -> Result<Self> {
        match ContentInfo::from_der(bytes) {
            Ok(ci) => {
                if ci.content_type != oids::GBT_SIGNED_DATA {
                    return Err(Error::Security(format!(
                        "Unexpected content type {} in signed value",
                        ci.content_type
                    )));
                }
                let any = ci.content.ok_or_else(|| {
                    Error::Security("Signed value carries no SignedData".to_string())
                })?;
                Ok(SignedData::from_der(&any.to_der()?)?)
            }
            Err(outer) => SignedData::from_der(bytes).map_err(|_| Error::Decode(outer)),
        }
    }

    /// Encode wrapped in the outer `ContentInfo(signedData)`.
    pub fn to_signed_value(&self) -> Result<Vec<u8>> {
        Ok(ContentInfo::signed_data(self)?.to_der()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::asn1::UtcTime;
    use x509_cert::attr::Attribute;

    fn alg(oid: ObjectIdentifier) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid,
            parameters: None,
        }
    }

    fn sample_signer(serial: u8, with_attrs: bool) -> SignerInfo {
        let attrs = if with_attrs {
            let time = UtcTime::from_unix_duration(std::time::Duration::from_secs(1_600_000_000))
                .unwrap();
            let attr = Attribute {
                oid: oids::PKCS9_SIGNING_TIME,
                values: SetOfVec::try_from(vec![Any::encode_from(&time).unwrap()]).unwrap(),
            };
            Some(SetOfVec::try_from(vec![attr]).unwrap())
        } else {
            None
        };
        SignerInfo {
            version: StructVersion::V1,
            issuer_and_serial_number: IssuerAndSerialNumber {
                issuer: "CN=Root".parse().unwrap(),
                serial_number: SerialNumber::new(&[serial]).unwrap(),
            },
            digest_algorithm: alg(oids::SM3),
            authenticated_attributes: attrs,
            digest_encryption_algorithm: alg(oids::SM2_SIGN),
            encrypted_digest: OctetString::new(vec![0xAB; 8]).unwrap(),
            unauthenticated_attributes: None,
        }
    }

    fn sample_signed_data(with_attrs: bool) -> SignedData {
        SignedData {
            version: StructVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![alg(oids::SM3)]).unwrap(),
            content_info: ContentInfo::data(b"digest-bytes").unwrap(),
            certificates: None,
            crls: None,
            signer_infos: SetOfVec::try_from(vec![sample_signer(1, with_attrs)]).unwrap(),
        }
    }

    #[test]
    fn test_content_info_plaintext() {
        let ci = ContentInfo::data(b"abc").unwrap();
        assert_eq!(ci.plaintext().unwrap().as_deref(), Some(&b"abc"[..]));
        assert_eq!(ContentInfo::detached().plaintext().unwrap(), None);
    }

    #[test]
    fn test_signed_data_roundtrip_minimal() {
        let sd = sample_signed_data(false);
        let der = sd.to_der().unwrap();
        assert_eq!(SignedData::from_der(&der).unwrap(), sd);
    }

    #[test]
    fn test_signed_data_roundtrip_with_attributes() {
        let sd = sample_signed_data(true);
        let der = sd.to_der().unwrap();
        let decoded = SignedData::from_der(&der).unwrap();
        assert_eq!(decoded, sd);
        let signer = decoded.signer_infos.iter().next().unwrap();
        assert!(signer.attribute(&oids::PKCS9_SIGNING_TIME).is_some());
        assert!(signer.attribute(&oids::PKCS9_MESSAGE_DIGEST).is_none());
    }

    #[test]
    fn test_signer_info_attribute_tag_is_context_zero() {
        let signer = sample_signer(7, true);
        let der = signer.to_der().unwrap();
        // [0] IMPLICIT constructed
        assert!(der.contains(&0xA0));
        let decoded = SignerInfo::from_der(&der).unwrap();
        assert_eq!(decoded, signer);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = sample_signed_data(true).to_der().unwrap();
        let b = sample_signed_data(true).to_der().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signed_value_outer_and_bare() {
        let sd = sample_signed_data(false);
        let outer = sd.to_signed_value().unwrap();
        assert_eq!(SignedData::from_signed_value(&outer).unwrap(), sd);
        let bare = sd.to_der().unwrap();
        assert_eq!(SignedData::from_signed_value(&bare).unwrap(), sd);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut der = sample_signed_data(false).to_der().unwrap();
        der.push(0x00);
        assert!(SignedData::from_der(&der).is_err());
        assert!(matches!(SignedData::from_signed_value(&der), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let mut der = sample_signed_data(false).to_der().unwrap();
        der[0] = 0x31;
        assert!(SignedData::from_der(&der).is_err());
    }

    #[test]
    fn test_issuer_serial_matching() {
        let a = sample_signer(1, false).issuer_and_serial_number;
        let b = sample_signer(2, false).issuer_and_serial_number;
        assert_ne!(a, b);
    }
}
