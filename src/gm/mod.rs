//! Chinese commercial cryptography (GM) primitives.
//!
//! This module wires the SM2 signature scheme and the SM3 digest into the
//! shapes used by the OFD standards:
//!
//! - [`sm2strut`]: the GB/T 35275 `SignedData` envelope
//! - [`ses`]: GM/T 0031 (v1) and GB/T 38540 (v4) electronic seals
//! - [`cert`]: certificate and key loading
//!
//! SM2 signatures always use the default user identifier [`DIST_ID`] from
//! GM/T 0009, and signature values travel as `SEQUENCE { r, s }`.

pub mod cert;
pub mod ses;
pub mod sm2strut;

use crate::error::{Error, Result};
use der::asn1::{ObjectIdentifier, UintRef};
use der::{Decode, Encode, Sequence};
use signature::{Signer, Verifier};
use sm2::dsa::{Signature, SigningKey, VerifyingKey};
use sm3::{Digest, Sm3};

/// Default SM2 user distinguishing identifier (GM/T 0009).
pub const DIST_ID: &str = "1234567812345678";

/// GM object identifiers.
pub mod oids {
    use der::asn1::ObjectIdentifier;

    /// SM3 digest (1.2.156.10197.1.401)
    pub const SM3: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.401");
    /// SM2 signature (1.2.156.10197.1.301.1)
    pub const SM2_SIGN: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301.1");
    /// SM2 elliptic curve public key (1.2.156.10197.1.301)
    pub const SM2_CURVE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");
    /// SM2 signature over SM3 digest (1.2.156.10197.1.501)
    pub const SM2_WITH_SM3: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.156.10197.1.501");

    /// GB/T 35275 data content type
    pub const GBT_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.6.1.4.2.1");
    /// GB/T 35275 signedData content type
    pub const GBT_SIGNED_DATA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.156.10197.6.1.4.2.2");

    /// PKCS#9 contentType attribute
    pub const PKCS9_CONTENT_TYPE: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
    /// PKCS#9 messageDigest attribute
    pub const PKCS9_MESSAGE_DIGEST: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
    /// PKCS#9 signingTime attribute
    pub const PKCS9_SIGNING_TIME: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
}

/// Digest algorithm bound to a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SM3 (GB/T 32905)
    #[default]
    Sm3,
}

impl DigestAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sm3 => oids::SM3,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sm3 => "SM3",
        }
    }

    /// Look up an algorithm by OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        if *oid == oids::SM3 {
            Some(DigestAlgorithm::Sm3)
        } else {
            None
        }
    }

    /// Digest `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sm3 => sm3(data),
        }
    }
}

/// SM3 digest of `data`.
pub fn sm3(data: &[u8]) -> Vec<u8> {
    Sm3::digest(data).to_vec()
}

/// `SM2Signature ::= SEQUENCE { R INTEGER, S INTEGER }` (GM/T 0009).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct Sm2SignatureDer<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// Encode an SM2 signature as DER `SEQUENCE { r, s }`.
pub fn encode_signature(sig: &Signature) -> Result<Vec<u8>> {
    let bytes = sig.to_bytes();
    let (r, s) = bytes.split_at(32);
    let der = Sm2SignatureDer {
        r: UintRef::new(r)?,
        s: UintRef::new(s)?,
    };
    Ok(der.to_der()?)
}

/// Decode an SM2 signature from DER or raw 64-byte `r || s`.
pub fn decode_signature(bytes: &[u8]) -> Result<Signature> {
    let der = match Sm2SignatureDer::from_der(bytes) {
        Ok(der) => der,
        Err(_) if bytes.len() == 64 => return Ok(Signature::from_slice(bytes)?),
        Err(e) => return Err(e.into()),
    };
    let mut raw = [0u8; 64];
    copy_scalar(der.r.as_bytes(), &mut raw[..32])?;
    copy_scalar(der.s.as_bytes(), &mut raw[32..])?;
    Ok(Signature::from_slice(&raw)?)
}

fn copy_scalar(src: &[u8], dst: &mut [u8]) -> Result<()> {
    if src.len() > dst.len() {
        return Err(Error::Security(format!(
            "SM2 signature component is {} bytes, expected at most {}",
            src.len(),
            dst.len()
        )));
    }
    let offset = dst.len() - src.len();
    dst[offset..].copy_from_slice(src);
    Ok(())
}

/// Sign `msg` with SM2 (SM3 digest, default user ID), returning DER.
pub fn sm2_sign(key: &sm2::SecretKey, msg: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::new(DIST_ID, key)?;
    let sig: Signature = signing_key.try_sign(msg)?;
    encode_signature(&sig)
}

/// Verify an SM2 signature (DER or raw) over `msg`.
///
/// Returns `Ok(false)` on a well-formed signature that does not match;
/// malformed signature encodings are errors.
pub fn sm2_verify(key: &sm2::PublicKey, msg: &[u8], sig: &[u8]) -> Result<bool> {
    let verifying_key = VerifyingKey::new(DIST_ID, key.clone())?;
    let sig = decode_signature(sig)?;
    Ok(verifying_key.verify(msg, &sig).is_ok())
}
