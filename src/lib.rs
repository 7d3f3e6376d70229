// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::new_without_default)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # OFD Sign
//!
//! Digital signatures, electronic seals and anti-tampering protection for
//! OFD documents, built on the Chinese commercial cryptography suite (SM2/SM3).
//!
//! ## Core Features
//!
//! ### Signing & Validation
//! - **GB/T 35275**: SM2 `SignedData` envelope, minimal and PKCS#9 attribute layouts
//! - **Electronic Seals**: GM/T 0031 (v1) and GB/T 38540 (v4) seal signatures
//! - **Document Signatures**: `Signatures.xml`/`Signature.xml` records per GB/T 33190
//! - **Stamp Placement**: ordinary, riding and cutting-ride stamps on any page edge
//! - **Signature Chains**: continue-sign mode and relative signatures
//!
//! ### Anti-Tampering
//! - **Manifest Protection**: signed inventory of every file in the package
//! - **Smuggling Detection**: undeclared files reported by path
//!
//! ## Architecture
//! - **Pluggable Containers**: signed value formats behind [`signatures::SignatureContainer`]
//! - **Pluggable Validators**: [`signatures::SignedDataValidator`] per signature kind
//! - **Scratch Workspaces**: packages are edited unpacked and repacked atomically
//!
//! Tampering is never an [`Error`]: verification returns a [`VerifyResult`]
//! carrying the failure reason.
//!
//! ## Quick Start - Anti-Tampering
//!
//! ```ignore
//! use ofd_sign::integrity::{GmProtectSigner, GmProtectVerifier, OfdIntegrity};
//!
//! # fn main() -> ofd_sign::Result<()> {
//! let integrity = OfdIntegrity::default();
//! integrity.protect("in.ofd", "protected.ofd", &GmProtectSigner::new(key, cert))?;
//!
//! let report = integrity.verify("protected.ofd", &GmProtectVerifier::new())?;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

// Error handling
pub mod error;

// Configuration
pub mod config;

// Stamp geometry
pub mod geometry;

// Package container and XML object model
pub mod package;
pub mod xml;

// GM cryptography: SM2/SM3, GB/T 35275, electronic seals
pub mod gm;

// Anti-tampering protection
pub mod integrity;

// Document signatures
pub mod signatures;

// Re-exports
pub use error::{Error, Result};
pub use signatures::{VerifyFailure, VerifyResult};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
