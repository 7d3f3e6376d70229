//! OFD digital signatures and electronic seals (GB/T 33190 chapter 18).
//!
//! This module signs the default document of an OFD package and validates
//! existing signatures.
//!
//! ## Signing
//!
//! [`OfdSigner`] digests every file of the package into a `Signature.xml`
//! record and hands that record to a [`SignatureContainer`], which decides
//! the wire shape of the signed value:
//!
//! - [`DigitalSignContainer`]: bare SM2 signature
//! - [`Gbt35275Container`]: GB/T 35275 `SignedData`
//! - [`SesV1Container`], [`SesV4Container`]: electronic seal signatures
//!
//! Stamp appearances are attached with [`NormalStampPos`],
//! [`RidingStampPos`] and [`CuttingRideStampPos`].
//!
//! ## Example
//!
//! ```ignore
//! use ofd_sign::config::SignConfig;
//! use ofd_sign::signatures::{Gbt35275Container, NormalStampPos, OfdSigner};
//!
//! let container = Gbt35275Container::new(key, cert);
//! OfdSigner::open("contract.ofd", container, SignConfig::new())?
//!     .with_appearance(NormalStampPos::new(1, 100.0, 200.0, 40.0, 40.0))
//!     .sign_to("contract-signed.ofd")?;
//! ```
//!
//! ## Validation
//!
//! [`OfdValidator`] re-digests every referenced file, checks seals against
//! the signed value, then runs a [`SignedDataValidator`] over each record.
//! Tampering is reported in the returned [`ValidationReport`].
//!
//! ## Clearing
//!
//! [`OfdSignCleaner`] unregisters every signature list and deletes the
//! `Signs` directories, leaving the document ready to be signed afresh.

pub mod cleaner;
pub mod container;
pub mod document;
pub mod id;
pub mod records;
pub mod signer;
pub mod stamp;
mod types;
pub mod validator;

pub use cleaner::{CleanSummary, OfdSignCleaner};
pub use container::{
    DigitalSignContainer, Gbt35275Container, SesV1Container, SesV4Container, SignatureContainer,
    TimestampHook,
};
pub use document::{OfdDocument, PageInfo};
pub use id::{NumberFormatSignId, SignIdProvider, StandFormatSignId};
pub use records::{
    Reference, SignatureEntry, SignatureList, SignatureRecord, SignedInfo, StampAnnot,
};
pub use signer::OfdSigner;
pub use stamp::{CuttingRideStampPos, NormalStampPos, RidingStampPos, Side, StampAppearance};
pub use types::{SigType, SignIdFormat, SignMode, VerifyFailure, VerifyResult};
pub use validator::{
    DigitalValidator, Gbt35275Validator, OfdValidator, SesValidator, SignatureCheck,
    SignedDataValidator, ValidationReport,
};
