//! Anti-tampering manifest (`OFDEntries.xml`).
//!
//! ```xml
//! <ofd:DocEntries xmlns:ofd="http://www.ofdspec.org/2016" ID="1"
//!     CreatorName="ofd_sign" Version="0.3.0" CreationDate="2024-01-01T08:00:00">
//!   <ofd:SignedValueLoc>/signedvalue.dat</ofd:SignedValueLoc>
//!   <ofd:FileList>
//!     <ofd:File ID="2">/Doc_0/Document.xml</ofd:File>
//!   </ofd:FileList>
//! </ofd:DocEntries>
//! ```

use crate::error::{Error, Result};
use crate::xml::Element;

/// One declared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Entry ID, unique within the manifest
    pub id: String,
    /// Container-absolute path
    pub path: String,
}

/// Inventory of every file a protected package must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Manifest ID
    pub id: String,
    /// Creating tool
    pub creator_name: String,
    /// Creating tool version
    pub version: String,
    /// Creation timestamp
    pub creation_date: String,
    /// Where the signature over this manifest is stored
    pub signed_value_loc: String,
    /// Declared files in traversal order
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Whether `path` is declared. A leading `/` is ignored on both sides.
    pub fn declares(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.files
            .iter()
            .any(|f| f.path.trim_start_matches('/') == path)
    }

    /// Build the XML element.
    pub fn to_element(&self) -> Element {
        let mut file_list = Element::ofd("FileList");
        for entry in &self.files {
            file_list.push(
                Element::ofd("File")
                    .with_attr("ID", entry.id.as_str())
                    .with_text(entry.path.as_str()),
            );
        }
        Element::ofd_root("DocEntries")
            .with_attr("ID", self.id.as_str())
            .with_attr("CreatorName", self.creator_name.as_str())
            .with_attr("Version", self.version.as_str())
            .with_attr("CreationDate", self.creation_date.as_str())
            .with_child(Element::ofd("SignedValueLoc").with_text(self.signed_value_loc.as_str()))
            .with_child(file_list)
    }

    /// Read a manifest from its XML element.
    pub fn from_element(root: &Element) -> Result<Self> {
        if root.local_name() != "DocEntries" {
            return Err(Error::InvalidOfd(format!(
                "Expected <ofd:DocEntries>, found <{}>",
                root.name
            )));
        }
        let signed_value_loc = root
            .child_text("SignedValueLoc")
            .ok_or_else(|| Error::InvalidOfd("Manifest lacks SignedValueLoc".to_string()))?
            .to_string();

        let mut files = Vec::new();
        if let Some(list) = root.child("FileList") {
            for file in list.children_named("File") {
                files.push(ManifestEntry {
                    id: file.required_attr("ID")?.to_string(),
                    path: file.text_or_empty().to_string(),
                });
            }
        }

        Ok(Self {
            id: root.attr("ID").unwrap_or_default().to_string(),
            creator_name: root.attr("CreatorName").unwrap_or_default().to_string(),
            version: root.attr("Version").unwrap_or_default().to_string(),
            creation_date: root.attr("CreationDate").unwrap_or_default().to_string(),
            signed_value_loc,
            files,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            id: "1".to_string(),
            creator_name: "ofd_sign".to_string(),
            version: "0.3.0".to_string(),
            creation_date: "2024-01-01T08:00:00".to_string(),
            signed_value_loc: "/sv.dat".to_string(),
            files: vec![
                ManifestEntry {
                    id: "2".to_string(),
                    path: "/A.xml".to_string(),
                },
                ManifestEntry {
                    id: "3".to_string(),
                    path: "/B.xml".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_manifest_xml_roundtrip() {
        let m = sample();
        let bytes = m.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("<ofd:DocEntries"));
        assert!(text.contains("<ofd:File ID=\"2\">/A.xml</ofd:File>"));
        assert_eq!(Manifest::parse(&bytes).unwrap(), m);
    }

    #[test]
    fn test_declares() {
        let m = sample();
        assert!(m.declares("/A.xml"));
        assert!(!m.declares("/C.xml"));
    }

    #[test]
    fn test_declares_ignores_leading_slash() {
        let mut m = sample();
        assert!(m.declares("A.xml"));
        m.files[0].path = "Doc_0/Document.xml".to_string();
        assert!(m.declares("/Doc_0/Document.xml"));
        assert!(m.declares("Doc_0/Document.xml"));
        assert!(!m.declares("/Document.xml"));
    }

    #[test]
    fn test_wrong_root_rejected() {
        let e = Element::ofd_root("Signatures");
        assert!(matches!(Manifest::from_element(&e), Err(Error::InvalidOfd(_))));
    }
}
