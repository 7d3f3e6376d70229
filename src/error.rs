//! Error types for the OFD signing library.
//!
//! This module defines every hard failure that can abort a signing, protection
//! or verification operation. Tampering found during verification is not an
//! error: it is reported through [`crate::VerifyResult`].

/// Result type alias for OFD signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during OFD signing and verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or non-canonical DER input, or a structure that failed to encode
    #[error("DER codec error: {0}")]
    Decode(#[from] der::Error),

    /// Key or algorithm misuse (missing key, unsupported algorithm, unusable certificate)
    #[error("Security error: {0}")]
    Security(String),

    /// The document is in a state that forbids the requested operation
    #[error("Protocol state error: {0}")]
    ProtocolState(String),

    /// IO error on the scratch workspace or the delivered output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[error("Container error: {0}")]
    Zip(String),

    /// XML parse or serialization error
    #[error("XML error: {0}")]
    Xml(String),

    /// OFD package structure is not what the standard requires
    #[error("Invalid OFD: {0}")]
    InvalidOfd(String),

    /// Caller supplied an argument that cannot be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<signature::Error> for Error {
    fn from(e: signature::Error) -> Self {
        Error::Security(format!("SM2 operation failed: {}", e))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e.to_string())
    }
}
