//! GM/T 0031-2014 electronic seal and seal signature (v1).
//!
//! ```text
//! SESeal ::= SEQUENCE {
//!     esealInfo   SES_SealInfo,
//!     signInfo    SES_SignInfo }
//!
//! SES_Signature ::= SEQUENCE {
//!     toSign      TBS_Sign,
//!     signature   BIT STRING }
//! ```

use super::{ExtData, PictureInfo, SesHeader};
use crate::error::Result;
use crate::gm::{cert, oids, sm2_sign, sm2_verify};
use der::asn1::{BitString, Ia5String, ObjectIdentifier, OctetString, UtcTime};
use der::{Decode, Encode, Sequence};
use x509_cert::Certificate;

/// `SES_ESPropertyInfo` (v1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PropertyInfo {
    /// Seal type: 1 organisation, 2 personal
    pub seal_type: u32,
    /// Seal name
    pub name: String,
    /// DER certificates of the seal holders
    pub cert_list: Vec<OctetString>,
    /// Creation time
    pub create_date: UtcTime,
    /// Start of validity
    pub valid_start: UtcTime,
    /// End of validity
    pub valid_end: UtcTime,
}

/// `SES_SealInfo` (v1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SealInfo {
    /// Header
    pub header: SesHeader,
    /// Seal identifier
    pub es_id: Ia5String,
    /// Seal properties
    pub property: PropertyInfo,
    /// Appearance
    pub picture: PictureInfo,
    /// Vendor extensions
    #[asn1(optional = "true")]
    pub ext_datas: Option<Vec<ExtData>>,
}

/// `SES_SignInfo`: the seal maker's signature over the seal.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignInfo {
    /// Maker certificate
    pub cert: OctetString,
    /// Signature algorithm
    pub signature_algorithm: ObjectIdentifier,
    /// Signature value
    pub sign_data: BitString,
}

/// Bytes the maker signs: `SEQUENCE { sealInfo, cert, signatureAlgorithm }`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SealTbs {
    seal_info: SealInfo,
    cert: OctetString,
    signature_algorithm: ObjectIdentifier,
}

/// `SESeal` (v1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SeSeal {
    /// Seal information
    pub seal_info: SealInfo,
    /// Maker signature
    pub sign_info: SignInfo,
}

impl SeSeal {
    /// Sign `seal_info` with the seal maker's key.
    pub fn build(
        seal_info: SealInfo,
        maker_key: &sm2::SecretKey,
        maker_cert: &Certificate,
    ) -> Result<Self> {
        let cert = OctetString::new(maker_cert.to_der()?)?;
        let tbs = SealTbs {
            seal_info,
            cert,
            signature_algorithm: oids::SM2_WITH_SM3,
        };
        let signature = sm2_sign(maker_key, &tbs.to_der()?)?;
        Ok(Self {
            seal_info: tbs.seal_info,
            sign_info: SignInfo {
                cert: tbs.cert,
                signature_algorithm: tbs.signature_algorithm,
                sign_data: BitString::from_bytes(&signature)?,
            },
        })
    }

    /// Check the maker's signature over the seal.
    pub fn verify_maker_signature(&self) -> Result<bool> {
        let maker = Certificate::from_der(self.sign_info.cert.as_bytes())?;
        let tbs = SealTbs {
            seal_info: self.seal_info.clone(),
            cert: self.sign_info.cert.clone(),
            signature_algorithm: self.sign_info.signature_algorithm,
        };
        sm2_verify(
            &cert::public_key(&maker)?,
            &tbs.to_der()?,
            self.sign_info.sign_data.raw_bytes(),
        )
    }
}

/// `TBS_Sign` (v1): what a seal signature covers.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TbsSign {
    /// Always 1
    pub version: u32,
    /// Seal used for signing
    pub eseal: SeSeal,
    /// Signing time as text `yyyy-MM-dd HH:mm:ss`
    pub time_info: BitString,
    /// Digest of the signed content
    pub data_hash: BitString,
    /// Free-form property string
    pub property_info: Ia5String,
    /// Signer certificate
    pub cert: OctetString,
    /// Signature algorithm
    pub signature_algorithm: ObjectIdentifier,
}

/// `SES_Signature` (v1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SesSignature {
    /// Signed body
    pub to_sign: TbsSign,
    /// Signature over the DER of `to_sign`
    pub signature: BitString,
}

impl SesSignature {
    /// Sign a `TBS_Sign` with the signer's key.
    pub fn sign(to_sign: TbsSign, key: &sm2::SecretKey) -> Result<Self> {
        let value = sm2_sign(key, &to_sign.to_der()?)?;
        Ok(Self {
            to_sign,
            signature: BitString::from_bytes(&value)?,
        })
    }

    /// Verify the signature with the certificate embedded in `to_sign`.
    pub fn verify_signature(&self) -> Result<bool> {
        let signer = Certificate::from_der(self.to_sign.cert.as_bytes())?;
        sm2_verify(
            &cert::public_key(&signer)?,
            &self.to_sign.to_der()?,
            self.signature.raw_bytes(),
        )
    }
}
