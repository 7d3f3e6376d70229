//! Signature types and verification outcomes.
//!
//! Tampering is an expected outcome of verification, not an error: every
//! verifier in this crate returns a [`VerifyResult`] and reserves
//! [`crate::Error`] for malformed input and I/O faults.

use std::fmt;

/// Why a verification did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    /// The signed content no longer matches the recorded digest
    ContentChanged,
    /// No embedded certificate matches the signer's issuer and serial
    NoMatchingCertificate,
    /// The signature value does not verify against the certificate key
    SignatureMismatch,
    /// The signed value uses a different attribute layout than the
    /// verifier was configured to accept
    UnexpectedLayout {
        /// Layout the verifier expected
        expected: &'static str,
        /// Layout found in the signed value
        found: &'static str,
    },
    /// A referenced file's digest differs from its `CheckValue`
    ReferenceMismatch(String),
    /// A referenced file is missing from the package
    MissingReference(String),
    /// The seal file differs from the seal embedded in the signed value
    SealMismatch,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyFailure::ContentChanged => write!(f, "content changed"),
            VerifyFailure::NoMatchingCertificate => write!(f, "no matching certificate"),
            VerifyFailure::SignatureMismatch => write!(f, "signature mismatch"),
            VerifyFailure::UnexpectedLayout { expected, found } => {
                write!(f, "unexpected attribute layout: expected {}, found {}", expected, found)
            }
            VerifyFailure::ReferenceMismatch(path) => write!(f, "reference changed: {}", path),
            VerifyFailure::MissingReference(path) => write!(f, "reference missing: {}", path),
            VerifyFailure::SealMismatch => write!(f, "seal mismatch"),
        }
    }
}

/// Outcome of verifying one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Whether the signature verified
    pub passed: bool,
    /// Failure reason when `passed` is false
    pub failure: Option<VerifyFailure>,
}

impl VerifyResult {
    /// A passing result.
    pub fn pass() -> Self {
        Self {
            passed: true,
            failure: None,
        }
    }

    /// A failing result with its reason.
    pub fn fail(failure: VerifyFailure) -> Self {
        Self {
            passed: false,
            failure: Some(failure),
        }
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }
}

/// Kind of signature a container produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigType {
    /// Electronic seal (`Type="Seal"`)
    #[default]
    Seal,
    /// Plain digital signature (`Type="Sign"`)
    Sign,
}

impl SigType {
    /// Value of the `Type` attribute in `Signatures.xml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SigType::Seal => "Seal",
            SigType::Sign => "Sign",
        }
    }

    /// Parse a `Type` attribute; absent or unknown values mean `Seal`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("Sign") => SigType::Sign,
            _ => SigType::Seal,
        }
    }
}

/// Whether a new signature also covers the signature list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignMode {
    /// Protect every file including `Signatures.xml`; no further
    /// signatures can be added afterwards.
    #[default]
    WholeProtected,
    /// Leave `Signatures.xml` unprotected so others can sign later.
    ContinueSign,
}

/// Format of signature IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignIdFormat {
    /// `1`, `2`, `3`
    #[default]
    Number,
    /// `001`, `002`
    NumberZeroPrefix,
    /// `s001`, `s002`
    Standard,
}
