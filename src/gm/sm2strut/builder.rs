//! Building GB/T 35275 `SignedData`.

use super::{ContentInfo, IssuerAndSerialNumber, SignedData, SignerInfo, StructVersion};
use crate::error::Result;
use crate::gm::{oids, sm2_sign, DigestAlgorithm};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use der::asn1::{OctetString, SetOfVec, UtcTime};
use der::Any;
use log::debug;
use spki::AlgorithmIdentifierOwned;
use std::time::SystemTime;
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

/// Where the digest lives and what the signature covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeLayout {
    /// Digest carried as `data` content; the signature covers it directly.
    #[default]
    Minimal,
    /// PKCS#9 attribute set (contentType, signingTime, messageDigest);
    /// content detached; the signature covers the attribute SET.
    Pkcs9,
}

impl AttributeLayout {
    /// Get the name of this layout.
    pub fn name(&self) -> &'static str {
        match self {
            AttributeLayout::Minimal => "minimal",
            AttributeLayout::Pkcs9 => "PKCS#9",
        }
    }
}

/// Digest-then-sign producer of [`SignedData`].
#[derive(Clone)]
pub struct SignedDataBuilder {
    key: sm2::SecretKey,
    certificate: Certificate,
    chain: Vec<Certificate>,
    digest_algorithm: DigestAlgorithm,
    layout: AttributeLayout,
    base64_digest: bool,
    signing_time: Option<SystemTime>,
}

impl SignedDataBuilder {
    /// Create a builder for the signer owning `certificate`.
    pub fn new(key: sm2::SecretKey, certificate: Certificate) -> Self {
        Self {
            key,
            certificate,
            chain: Vec::new(),
            digest_algorithm: DigestAlgorithm::Sm3,
            layout: AttributeLayout::Minimal,
            base64_digest: false,
            signing_time: None,
        }
    }

    /// Select the attribute layout.
    pub fn with_layout(mut self, layout: AttributeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Embed intermediate certificates alongside the signer's.
    pub fn with_chain(mut self, chain: Vec<Certificate>) -> Self {
        self.chain = chain;
        self
    }

    /// Carry the Base64 text of the digest instead of the raw digest
    /// (minimal layout only; some readers expect this form).
    pub fn with_base64_digest(mut self, enabled: bool) -> Self {
        self.base64_digest = enabled;
        self
    }

    /// Fix the PKCS#9 signing time instead of using the current time.
    pub fn with_signing_time(mut self, time: SystemTime) -> Self {
        self.signing_time = Some(time);
        self
    }

    /// The configured layout.
    pub fn layout(&self) -> AttributeLayout {
        self.layout
    }

    /// The digest algorithm bound to this builder.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Signer certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Digest `data`, then sign.
    pub fn sign(&self, data: &[u8]) -> Result<SignedData> {
        let digest = self.digest_algorithm.digest(data);
        self.sign_digest(&digest)
    }

    /// Sign a precomputed digest.
    pub fn sign_digest(&self, digest: &[u8]) -> Result<SignedData> {
        let digest_alg = AlgorithmIdentifierOwned {
            oid: self.digest_algorithm.oid(),
            parameters: None,
        };

        let (content_info, authenticated_attributes, signed_bytes) = match self.layout {
            AttributeLayout::Minimal => {
                let plaintext = if self.base64_digest {
                    STANDARD.encode(digest).into_bytes()
                } else {
                    digest.to_vec()
                };
                (ContentInfo::data(&plaintext)?, None, plaintext)
            }
            AttributeLayout::Pkcs9 => {
                let attrs = self.pkcs9_attributes(digest)?;
                let signed = der::Encode::to_der(&attrs)?;
                (ContentInfo::detached(), Some(attrs), signed)
            }
        };

        let signature = sm2_sign(&self.key, &signed_bytes)?;

        let signer = SignerInfo {
            version: StructVersion::V1,
            issuer_and_serial_number: IssuerAndSerialNumber::from_certificate(&self.certificate),
            digest_algorithm: digest_alg.clone(),
            authenticated_attributes,
            digest_encryption_algorithm: AlgorithmIdentifierOwned {
                oid: oids::SM2_SIGN,
                parameters: None,
            },
            encrypted_digest: OctetString::new(signature)?,
            unauthenticated_attributes: None,
        };

        let mut certs = Vec::with_capacity(1 + self.chain.len());
        certs.push(self.certificate.clone());
        certs.extend(self.chain.iter().cloned());

        debug!(
            "Built SignedData ({} layout, {} certificates)",
            self.layout.name(),
            certs.len()
        );

        Ok(SignedData {
            version: StructVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg])?,
            content_info,
            certificates: Some(SetOfVec::try_from(certs)?),
            crls: None,
            signer_infos: SetOfVec::try_from(vec![signer])?,
        })
    }

    fn pkcs9_attributes(&self, digest: &[u8]) -> Result<SetOfVec<Attribute>> {
        let time = self.signing_time.unwrap_or_else(SystemTime::now);
        let attrs = vec![
            single_attribute(oids::PKCS9_CONTENT_TYPE, Any::encode_from(&oids::GBT_DATA)?)?,
            single_attribute(
                oids::PKCS9_SIGNING_TIME,
                Any::encode_from(&UtcTime::from_system_time(time)?)?,
            )?,
            single_attribute(
                oids::PKCS9_MESSAGE_DIGEST,
                Any::encode_from(&OctetString::new(digest)?)?,
            )?,
        ];
        Ok(SetOfVec::try_from(attrs)?)
    }
}

fn single_attribute(oid: der::asn1::ObjectIdentifier, value: Any) -> Result<Attribute> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

impl std::fmt::Debug for SignedDataBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedDataBuilder")
            .field("key", &"[REDACTED]")
            .field("subject", &self.certificate.tbs_certificate.subject.to_string())
            .field("chain", &format!("{} certificates", self.chain.len()))
            .field("layout", &self.layout)
            .field("base64_digest", &self.base64_digest)
            .finish()
    }
}
