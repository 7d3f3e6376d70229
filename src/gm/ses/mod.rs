//! Electronic seal (SES) structures.
//!
//! Two revisions are in circulation:
//!
//! - [`v1`]: GM/T 0031-2014, UTCTime validity and a legacy `SES_SignInfo`
//! - [`v4`]: GB/T 38540-2020, GeneralizedTime validity, digest-only
//!   certificate lists and an optional timestamp on signatures
//!
//! Both share the header, picture and extension types defined here. The
//! revision of an encoded seal or signature is told apart by the number of
//! elements in its outer SEQUENCE, see [`seal_version`] and
//! [`signature_version`].

pub mod v1;
pub mod v4;

use crate::error::{Error, Result};
use der::asn1::{Ia5String, ObjectIdentifier, OctetString};
use der::{Any, Decode, Sequence};

/// Seal revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SesVersion {
    /// GM/T 0031-2014
    V1,
    /// GB/T 38540-2020
    V4,
}

impl SesVersion {
    /// Version number carried in `SES_Header`.
    pub fn number(&self) -> u32 {
        match self {
            SesVersion::V1 => 1,
            SesVersion::V4 => 4,
        }
    }
}

/// `SES_Header ::= SEQUENCE { ID IA5String, version INTEGER, Vid IA5String }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SesHeader {
    /// Always `ES`
    pub id: Ia5String,
    /// Seal format version
    pub version: u32,
    /// Vendor identifier
    pub vid: Ia5String,
}

impl SesHeader {
    /// Header for `version` issued by vendor `vid`.
    pub fn new(version: SesVersion, vid: &str) -> Result<Self> {
        Ok(Self {
            id: Ia5String::new("ES")?,
            version: version.number(),
            vid: Ia5String::new(vid)?,
        })
    }
}

/// `SES_ESPictrueInfo`: the seal's visual appearance.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PictureInfo {
    /// Image format, e.g. `PNG`, `OFD`
    pub pic_type: Ia5String,
    /// Encoded image
    pub data: OctetString,
    /// Display width in millimetres
    pub width: u32,
    /// Display height in millimetres
    pub height: u32,
}

impl PictureInfo {
    /// Build picture info from raw image bytes.
    pub fn new(pic_type: &str, data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            pic_type: Ia5String::new(pic_type)?,
            data: OctetString::new(data)?,
            width,
            height,
        })
    }
}

/// `ExtData`: vendor extension.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ExtData {
    /// Extension OID
    pub extn_id: ObjectIdentifier,
    /// Whether readers must understand the extension
    #[asn1(default = "Default::default")]
    pub critical: bool,
    /// Extension payload
    pub extn_value: OctetString,
}

/// Revision of an encoded `SESeal`: 2 elements is v1, 4 is v4.
pub fn seal_version(der: &[u8]) -> Result<SesVersion> {
    match top_level_count(der)? {
        2 => Ok(SesVersion::V1),
        4 => Ok(SesVersion::V4),
        n => Err(Error::InvalidArgument(format!(
            "Not an electronic seal: {} top-level elements",
            n
        ))),
    }
}

/// Revision of an encoded `SES_Signature`: 2 elements is v1, 4 or 5
/// (with timestamp) is v4.
pub fn signature_version(der: &[u8]) -> Result<SesVersion> {
    match top_level_count(der)? {
        2 => Ok(SesVersion::V1),
        4 | 5 => Ok(SesVersion::V4),
        n => Err(Error::InvalidArgument(format!(
            "Not an electronic seal signature: {} top-level elements",
            n
        ))),
    }
}

fn top_level_count(der: &[u8]) -> Result<usize> {
    Ok(Vec::<Any>::from_der(der)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Encode;

    #[test]
    fn test_header_roundtrip() {
        let header = SesHeader::new(SesVersion::V4, "ofd_sign").unwrap();
        let der = header.to_der().unwrap();
        let decoded = SesHeader::from_der(&der).unwrap();
        assert_eq!(decoded.id.to_string(), "ES");
        assert_eq!(decoded.version, 4);
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_ext_data_default_critical_omitted() {
        let ext = ExtData {
            extn_id: ObjectIdentifier::new_unwrap("1.2.3.4"),
            critical: false,
            extn_value: OctetString::new(vec![1, 2, 3]).unwrap(),
        };
        let der = ext.to_der().unwrap();
        // BOOLEAN tag absent when critical is the default
        assert!(!der.windows(2).any(|w| w == [0x01, 0x01]));
        assert_eq!(ExtData::from_der(&der).unwrap(), ext);
    }

    #[test]
    fn test_version_detection_rejects_other_shapes() {
        let header = SesHeader::new(SesVersion::V1, "x").unwrap().to_der().unwrap();
        assert!(seal_version(&header).is_err());
        assert!(signature_version(&header).is_err());
        assert!(seal_version(b"\x04\x00").is_err());
    }
}
