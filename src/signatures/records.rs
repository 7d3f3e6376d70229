//! Signature list (`Signatures.xml`) and signature record (`Signature.xml`).
//!
//! ```xml
//! <ofd:Signatures xmlns:ofd="http://www.ofdspec.org/2016">
//!   <ofd:MaxSignId>2</ofd:MaxSignId>
//!   <ofd:Signature ID="1" Type="Seal" BaseLoc="/Doc_0/Signs/Sign_0/Signature.xml"/>
//!   <ofd:Signature ID="2" Type="Sign" BaseLoc="/Doc_0/Signs/Sign_1/Signature.xml" Relative="1"/>
//! </ofd:Signatures>
//! ```

use super::types::SigType;
use crate::config::ProviderInfo;
use crate::error::{Error, Result};
use crate::geometry::StBox;
use crate::xml::Element;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Timestamp format of `SignatureDateTime`.
pub const SIGNATURE_DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

fn expect_root(root: &Element, local: &str) -> Result<()> {
    if root.local_name() != local {
        return Err(Error::InvalidOfd(format!(
            "Expected <ofd:{}>, found <{}>",
            local, root.name
        )));
    }
    Ok(())
}

/// One `<ofd:Signature>` entry of the signature list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Signature ID
    pub id: String,
    /// Seal or plain signature
    pub sig_type: SigType,
    /// Location of the `Signature.xml` record
    pub base_loc: String,
    /// ID of the signature this one is chained to
    pub relative: Option<String>,
}

/// Document signature list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureList {
    /// Highest signature ID handed out
    pub max_sign_id: Option<String>,
    /// Entries in signing order
    pub entries: Vec<SignatureEntry>,
}

impl SignatureList {
    /// Append an entry and bump `MaxSignId`.
    pub fn push(&mut self, entry: SignatureEntry) {
        self.max_sign_id = Some(entry.id.clone());
        self.entries.push(entry);
    }

    /// Entry by ID.
    pub fn entry(&self, id: &str) -> Option<&SignatureEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Build the XML element.
    pub fn to_element(&self) -> Element {
        let mut root = Element::ofd_root("Signatures");
        if let Some(max) = &self.max_sign_id {
            root.push(Element::ofd("MaxSignId").with_text(max.as_str()));
        }
        for entry in &self.entries {
            let mut e = Element::ofd("Signature")
                .with_attr("ID", entry.id.as_str())
                .with_attr("Type", entry.sig_type.as_str())
                .with_attr("BaseLoc", entry.base_loc.as_str());
            if let Some(rel) = &entry.relative {
                e.set_attr("Relative", rel.as_str());
            }
            root.push(e);
        }
        root
    }

    /// Read from the XML element.
    pub fn from_element(root: &Element) -> Result<Self> {
        expect_root(root, "Signatures")?;
        let entries = root
            .children_named("Signature")
            .map(|e| {
                Ok(SignatureEntry {
                    id: e.required_attr("ID")?.to_string(),
                    sig_type: SigType::parse(e.attr("Type")),
                    base_loc: e.required_attr("BaseLoc")?.to_string(),
                    relative: e.attr("Relative").map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            max_sign_id: root.child_text("MaxSignId").map(str::to_string),
            entries,
        })
    }

    /// Serialize to XML bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_element().to_bytes()
    }

    /// Parse from XML bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::from_element(&Element::parse(bytes)?)
    }
}

/// A protected file and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Container-absolute path
    pub file_ref: String,
    /// Digest of the file at signing time
    pub check_value: Vec<u8>,
}

/// Visual appearance of a seal on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct StampAnnot {
    /// Annotation ID, unique within the signature
    pub id: String,
    /// Object ID of the page
    pub page_ref: String,
    /// Where the full seal image is drawn
    pub boundary: StBox,
    /// Visible part, relative to `boundary`
    pub clip: Option<StBox>,
}

impl StampAnnot {
    fn to_element(&self) -> Element {
        let mut e = Element::ofd("StampAnnot")
            .with_attr("ID", self.id.as_str())
            .with_attr("PageRef", self.page_ref.as_str())
            .with_attr("Boundary", self.boundary.to_string());
        if let Some(clip) = &self.clip {
            e.set_attr("Clip", clip.to_string());
        }
        e
    }

    fn from_element(e: &Element) -> Result<Self> {
        Ok(Self {
            id: e.required_attr("ID")?.to_string(),
            page_ref: e.required_attr("PageRef")?.to_string(),
            boundary: e.required_attr("Boundary")?.parse()?,
            clip: e.attr("Clip").map(str::parse).transpose()?,
        })
    }
}

/// `<ofd:SignedInfo>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedInfo {
    /// Signing software
    pub provider: ProviderInfo,
    /// Signature algorithm (OID text)
    pub signature_method: String,
    /// Signing time, `yyyyMMddHHmmss` UTC
    pub signature_date_time: String,
    /// Digest algorithm of every `CheckValue` (OID text)
    pub check_method: String,
    /// Protected files
    pub references: Vec<Reference>,
    /// Appearances
    pub stamp_annots: Vec<StampAnnot>,
    /// Location of `Seal.esl`
    pub seal_loc: Option<String>,
}

/// A signature record (`Signature.xml`).
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureRecord {
    /// What was signed
    pub signed_info: SignedInfo,
    /// Location of `SignedValue.dat`
    pub signed_value_loc: String,
}

impl SignatureRecord {
    /// Whether the record protects the file at `loc`.
    pub fn references_file(&self, loc: &str) -> bool {
        self.signed_info.references.iter().any(|r| r.file_ref == loc)
    }

    /// Build the XML element.
    pub fn to_element(&self) -> Element {
        let info = &self.signed_info;
        let provider = Element::ofd("Provider")
            .with_attr("ProviderName", info.provider.name.as_str())
            .with_attr("Version", info.provider.version.as_str())
            .with_attr("Company", info.provider.company.as_str());

        let mut references =
            Element::ofd("References").with_attr("CheckMethod", info.check_method.as_str());
        for r in &info.references {
            references.push(
                Element::ofd("Reference")
                    .with_attr("FileRef", r.file_ref.as_str())
                    .with_child(Element::ofd("CheckValue").with_text(STANDARD.encode(&r.check_value))),
            );
        }

        let mut signed_info = Element::ofd("SignedInfo")
            .with_child(provider)
            .with_child(Element::ofd("SignatureMethod").with_text(info.signature_method.as_str()))
            .with_child(
                Element::ofd("SignatureDateTime").with_text(info.signature_date_time.as_str()),
            )
            .with_child(references);
        for annot in &info.stamp_annots {
            signed_info.push(annot.to_element());
        }
        if let Some(seal) = &info.seal_loc {
            signed_info
                .push(Element::ofd("Seal").with_child(Element::ofd("BaseLoc").with_text(seal.as_str())));
        }

        Element::ofd_root("Signature")
            .with_child(signed_info)
            .with_child(Element::ofd("SignedValue").with_text(self.signed_value_loc.as_str()))
    }

    /// Read from the XML element.
    pub fn from_element(root: &Element) -> Result<Self> {
        expect_root(root, "Signature")?;
        let info = root
            .child("SignedInfo")
            .ok_or_else(|| Error::InvalidOfd("Signature lacks SignedInfo".to_string()))?;

        let provider = match info.child("Provider") {
            Some(p) => ProviderInfo {
                name: p.attr("ProviderName").unwrap_or_default().to_string(),
                version: p.attr("Version").unwrap_or_default().to_string(),
                company: p.attr("Company").unwrap_or_default().to_string(),
            },
            None => return Err(Error::InvalidOfd("SignedInfo lacks Provider".to_string())),
        };

        let refs = info
            .child("References")
            .ok_or_else(|| Error::InvalidOfd("SignedInfo lacks References".to_string()))?;
        let references = refs
            .children_named("Reference")
            .map(|r| {
                let encoded = r.child_text("CheckValue").unwrap_or_default();
                let check_value = STANDARD.decode(encoded).map_err(|e| {
                    Error::InvalidOfd(format!("Bad CheckValue '{}': {}", encoded, e))
                })?;
                Ok(Reference {
                    file_ref: r.required_attr("FileRef")?.to_string(),
                    check_value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let stamp_annots = info
            .children_named("StampAnnot")
            .map(StampAnnot::from_element)
            .collect::<Result<Vec<_>>>()?;

        let signed_value_loc = root
            .child_text("SignedValue")
            .ok_or_else(|| Error::InvalidOfd("Signature lacks SignedValue".to_string()))?
            .to_string();

        Ok(Self {
            signed_info: SignedInfo {
                provider,
                signature_method: info.child_text("SignatureMethod").unwrap_or_default().to_string(),
                signature_date_time: info
                    .child_text("SignatureDateTime")
                    .unwrap_or_default()
                    .to_string(),
                check_method: refs.attr("CheckMethod").unwrap_or_default().to_string(),
                references,
                stamp_annots,
                seal_loc: info
                    .child("Seal")
                    .and_then(|s| s.child_text("BaseLoc"))
                    .map(str::to_string),
            },
            signed_value_loc,
        })
    }

    /// Serialize to XML bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_element().to_bytes()
    }

    /// Parse from XML bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::from_element(&Element::parse(bytes)?)
    }
}
