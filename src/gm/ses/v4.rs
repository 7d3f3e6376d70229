//! GB/T 38540-2020 electronic seal and seal signature (v4).
//!
//! ```text
//! SESeal ::= SEQUENCE {
//!     eSealInfo       SES_SealInfo,
//!     cert            OCTET STRING,
//!     signAlgID       OBJECT IDENTIFIER,
//!     signedValue     BIT STRING }
//!
//! SES_Signature ::= SEQUENCE {
//!     toSign          TBS_Sign,
//!     cert            OCTET STRING,
//!     signatureAlgID  OBJECT IDENTIFIER,
//!     signature       BIT STRING,
//!     timeStamp       [0] EXPLICIT BIT STRING OPTIONAL }
//! ```

use super::{ExtData, PictureInfo, SesHeader};
use crate::error::Result;
use crate::gm::{cert, oids, sm2_sign, sm2_verify};
use der::asn1::{BitString, GeneralizedTime, Ia5String, ObjectIdentifier, OctetString, PrintableString};
use der::{
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Tag, Writer,
};
use x509_cert::Certificate;

/// `CertDigestObj`: a certificate identified by its digest.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertDigest {
    /// Digest algorithm name, e.g. `SM3`
    pub digest_type: PrintableString,
    /// Certificate digest
    pub value: OctetString,
}

/// `SES_CertList`: holders given as full certificates or as digests.
///
/// Both alternatives are SEQUENCE OF, so the preceding `certListType`
/// selects which one is on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CertList {
    /// `certListType = 1`: DER certificates
    Certs(Vec<OctetString>),
    /// `certListType = 2`: certificate digests
    Digests(Vec<CertDigest>),
}

impl CertList {
    /// Value of `certListType` for this alternative.
    pub fn list_type(&self) -> u32 {
        match self {
            CertList::Certs(_) => 1,
            CertList::Digests(_) => 2,
        }
    }
}

/// `SES_ESPropertyInfo` (v4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyInfo {
    /// Seal type: 1 organisation, 2 personal
    pub seal_type: u32,
    /// Seal name
    pub name: String,
    /// Holder certificates
    pub cert_list: CertList,
    /// Creation time
    pub create_date: GeneralizedTime,
    /// Start of validity
    pub valid_start: GeneralizedTime,
    /// End of validity
    pub valid_end: GeneralizedTime,
}

impl<'a> DecodeValue<'a> for PropertyInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let seal_type = reader.decode()?;
            let name = reader.decode()?;
            let cert_list = match reader.decode::<u32>()? {
                1 => CertList::Certs(reader.decode()?),
                2 => CertList::Digests(reader.decode()?),
                _ => return Err(Tag::Integer.value_error()),
            };
            Ok(Self {
                seal_type,
                name,
                cert_list,
                create_date: reader.decode()?,
                valid_start: reader.decode()?,
                valid_end: reader.decode()?,
            })
        })
    }
}

impl EncodeValue for PropertyInfo {
    fn value_len(&self) -> der::Result<Length> {
        let cert_list_len = match &self.cert_list {
            CertList::Certs(certs) => certs.encoded_len()?,
            CertList::Digests(digests) => digests.encoded_len()?,
        };
        [
            self.seal_type.encoded_len()?,
            self.name.encoded_len()?,
            self.cert_list.list_type().encoded_len()?,
            cert_list_len,
            self.create_date.encoded_len()?,
            self.valid_start.encoded_len()?,
            self.valid_end.encoded_len()?,
        ]
        .into_iter()
        .try_fold(Length::ZERO, |acc, len| acc + len)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.seal_type.encode(writer)?;
        self.name.encode(writer)?;
        self.cert_list.list_type().encode(writer)?;
        match &self.cert_list {
            CertList::Certs(certs) => certs.encode(writer)?,
            CertList::Digests(digests) => digests.encode(writer)?,
        }
        self.create_date.encode(writer)?;
        self.valid_start.encode(writer)?;
        self.valid_end.encode(writer)
    }
}

impl<'a> Sequence<'a> for PropertyInfo {}

/// `SES_SealInfo` (v4).
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

/// `SESeal` (v4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SeSeal {
    /// Seal information
    pub seal_info: SealInfo,
    /// Maker certificate
    pub cert: OctetString,
    /// Maker signature algorithm
    pub sign_alg_id: ObjectIdentifier,
    /// Maker signature over the DER of `seal_info`
    pub signed_value: BitString,
}

impl SeSeal {
    /// Sign `seal_info` with the seal maker's key.
    pub fn build(
        seal_info: SealInfo,
        maker_key: &sm2::SecretKey,
        maker_cert: &Certificate,
    ) -> Result<Self> {
        let signature = sm2_sign(maker_key, &seal_info.to_der()?)?;
        Ok(Self {
            seal_info,
            cert: OctetString::new(maker_cert.to_der()?)?,
            sign_alg_id: oids::SM2_WITH_SM3,
            signed_value: BitString::from_bytes(&signature)?,
        })
    }

    /// Check the maker's signature over the seal.
    pub fn verify_maker_signature(&self) -> Result<bool> {
        let maker = Certificate::from_der(self.cert.as_bytes())?;
        sm2_verify(
            &cert::public_key(&maker)?,
            &self.seal_info.to_der()?,
            self.signed_value.raw_bytes(),
        )
    }
}

/// `TBS_Sign` (v4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TbsSign {
    /// Always 4
    pub version: u32,
    /// Seal used for signing
    pub eseal: SeSeal,
    /// Signing time
    pub time_info: GeneralizedTime,
    /// Digest of the signed content
    pub data_hash: BitString,
    /// Free-form property string
    pub property_info: Ia5String,
    /// Extensions
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub ext_datas: Option<Vec<ExtData>>,
}

/// `SES_Signature` (v4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SesSignature {
    /// Signed body
    pub to_sign: TbsSign,
    /// Signer certificate
    pub cert: OctetString,
    /// Signature algorithm
    pub signature_alg_id: ObjectIdentifier,
    /// Signature over the DER of `to_sign`
    pub signature: BitString,
    /// Timestamp token over `signature`
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub time_stamp: Option<BitString>,
}

impl SesSignature {
    /// Sign a `TBS_Sign` with the signer's key and certificate.
    pub fn sign(to_sign: TbsSign, key: &sm2::SecretKey, signer: &Certificate) -> Result<Self> {
        let value = sm2_sign(key, &to_sign.to_der()?)?;
        Ok(Self {
            to_sign,
            cert: OctetString::new(signer.to_der()?)?,
            signature_alg_id: oids::SM2_WITH_SM3,
            signature: BitString::from_bytes(&value)?,
            time_stamp: None,
        })
    }

    /// Verify the signature with the embedded signer certificate.
    pub fn verify_signature(&self) -> Result<bool> {
        let signer = Certificate::from_der(self.cert.as_bytes())?;
        sm2_verify(
            &cert::public_key(&signer)?,
            &self.to_sign.to_der()?,
            self.signature.raw_bytes(),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gm::cert::generate_self_signed;
    use crate::gm::ses::{seal_version, signature_version, SesVersion};
    use rand_core::OsRng;
    use std::time::Duration;

    fn gt(secs: u64) -> GeneralizedTime {
        GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).unwrap()
    }

    pub(crate) fn sample_seal(cert_list: CertList) -> (sm2::SecretKey, Certificate, SeSeal) {
        let key = sm2::SecretKey::random(&mut OsRng);
        let cert = generate_self_signed(&key, "CN=Maker", &[4], Duration::from_secs(600)).unwrap();
        let info = SealInfo {
            header: SesHeader::new(SesVersion::V4, "ofd_sign").unwrap(),
            es_id: Ia5String::new("ES-0004").unwrap(),
            property: PropertyInfo {
                seal_type: 1,
                name: "Finance Seal".to_string(),
                cert_list,
                create_date: gt(1_600_000_000),
                valid_start: gt(1_600_000_000),
                valid_end: gt(1_700_000_000),
            },
            picture: PictureInfo::new("PNG", vec![1, 2, 3], 42, 42).unwrap(),
            ext_datas: None,
        };
        let seal = SeSeal::build(info, &key, &cert).unwrap();
        (key, cert, seal)
    }

    #[test]
    fn test_seal_roundtrip_with_cert_list() {
        let (_, cert, seal) =
            sample_seal(CertList::Certs(vec![OctetString::new(vec![0x30, 0x00]).unwrap()]));
        let der = seal.to_der().unwrap();
        assert_eq!(seal_version(&der).unwrap(), SesVersion::V4);
        let decoded = SeSeal::from_der(&der).unwrap();
        assert_eq!(decoded, seal);
        assert_eq!(decoded.cert.as_bytes(), cert.to_der().unwrap().as_slice());
        assert!(decoded.verify_maker_signature().unwrap());
    }

    #[test]
    fn test_seal_roundtrip_with_digest_list() {
        let digests = CertList::Digests(vec![CertDigest {
            digest_type: PrintableString::new("SM3").unwrap(),
            value: OctetString::new(vec![7u8; 32]).unwrap(),
        }]);
        let (_, _, seal) = sample_seal(digests);
        let der = seal.to_der().unwrap();
        let decoded = SeSeal::from_der(&der).unwrap();
        assert_eq!(decoded.seal_info.property.cert_list.list_type(), 2);
        assert_eq!(decoded, seal);
    }

    #[test]
    fn test_signature_with_timestamp() {
        let (key, cert, seal) = sample_seal(CertList::Certs(Vec::new()));
        let tbs = TbsSign {
            version: 4,
            eseal: seal,
            time_info: gt(1_650_000_000),
            data_hash: BitString::from_bytes(&[0u8; 32]).unwrap(),
            property_info: Ia5String::new("prop").unwrap(),
            ext_datas: None,
        };
        let mut sig = SesSignature::sign(tbs, &key, &cert).unwrap();
        let plain = sig.to_der().unwrap();
        assert_eq!(signature_version(&plain).unwrap(), SesVersion::V4);

        sig.time_stamp = Some(BitString::from_bytes(b"tst").unwrap());
        let stamped = sig.to_der().unwrap();
        assert_eq!(signature_version(&stamped).unwrap(), SesVersion::V4);
        let decoded = SesSignature::from_der(&stamped).unwrap();
        assert_eq!(decoded.time_stamp, sig.time_stamp);
        assert!(decoded.verify_signature().unwrap());
    }

    #[test]
    fn test_unknown_cert_list_type_rejected() {
        let (_, _, seal) = sample_seal(CertList::Certs(Vec::new()));
        let mut der = seal.seal_info.property.to_der().unwrap();
        // seal_type INTEGER, name UTF8String, then certListType INTEGER 1
        let pos = der.windows(3).position(|w| w == [0x02, 0x01, 0x01]).unwrap();
        let pos = der[pos + 3..]
            .windows(3)
            .position(|w| w == [0x02, 0x01, 0x01])
            .map(|p| p + pos + 3)
            .unwrap();
        der[pos + 2] = 0x09;
        assert!(PropertyInfo::from_der(&der).is_err());
    }
}
