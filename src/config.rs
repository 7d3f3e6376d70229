//! Configuration for protection and signing.

use crate::signatures::{SignIdFormat, SignMode};

/// Anti-tampering protection configuration.
#[derive(Debug, Clone)]
pub struct ProtectConfig {
    /// Container-absolute location of the manifest file.
    pub manifest_loc: String,

    /// Container-absolute location of the manifest's signed value.
    pub signed_value_loc: String,

    /// Name of the tool that created the manifest.
    pub creator_name: String,

    /// Version of the tool that created the manifest.
    pub tool_version: String,
}

impl Default for ProtectConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            manifest_loc: "/OFDEntries.xml".to_string(),
            signed_value_loc: "/signedvalue.dat".to_string(),
            creator_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set the signed value location.
    pub fn with_signed_value_loc(mut self, loc: impl Into<String>) -> Self {
        self.signed_value_loc = loc.into();
        self
    }

    /// Set the manifest location.
    pub fn with_manifest_loc(mut self, loc: impl Into<String>) -> Self {
        self.manifest_loc = loc.into();
        self
    }

    /// Set the creator name.
    pub fn with_creator_name(mut self, name: impl Into<String>) -> Self {
        self.creator_name = name.into();
        self
    }
}

/// Signature provider written into every `SignedInfo/Provider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Provider name
    pub name: String,
    /// Provider version
    pub version: String,
    /// Vendor / company
    pub company: String,
}

impl Default for ProviderInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            company: "ofd_sign".to_string(),
        }
    }
}

/// Document signing configuration.
#[derive(Debug, Clone, Default)]
pub struct SignConfig {
    /// Provider block
    pub provider: ProviderInfo,

    /// Whether the new signature also protects the signature list.
    pub sign_mode: SignMode,

    /// Format of freshly allocated signature IDs.
    pub id_format: SignIdFormat,

    /// Free-form property string handed to the signing container.
    pub property_info: Option<String>,

    /// ID of a prior signature this one is chained to.
    pub relative: Option<String>,
}

impl SignConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block.
    pub fn with_provider(mut self, provider: ProviderInfo) -> Self {
        self.provider = provider;
        self
    }

    /// Set the sign mode.
    pub fn with_sign_mode(mut self, mode: SignMode) -> Self {
        self.sign_mode = mode;
        self
    }

    /// Set the signature ID format.
    pub fn with_id_format(mut self, format: SignIdFormat) -> Self {
        self.id_format = format;
        self
    }

    /// Set the property information passed to the container.
    pub fn with_property_info(mut self, info: impl Into<String>) -> Self {
        self.property_info = Some(info.into());
        self
    }

    /// Chain this signature to a prior one.
    pub fn with_relative(mut self, id: impl Into<String>) -> Self {
        self.relative = Some(id.into());
        self
    }
}
