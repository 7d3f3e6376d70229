//! Removal of every signature from a package.
//!
//! Each `DocBody` loses its `Signatures` entry. When the signature list
//! lives in a `Signs` directory the whole directory goes with it; a list
//! stored elsewhere is deleted on its own.

use super::document::OFD_ENTRY;
use crate::error::{Error, Result};
use crate::package::{parent_loc, resolve_loc, Workspace};
use crate::xml::Element;
use log::{debug, info};
use std::path::Path;

/// Directory name that holds a document's signatures.
const SIGNS_DIR: &str = "Signs";

/// What a clean removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanSummary {
    /// Signature lists that were unregistered, container-absolute
    pub signature_lists: Vec<String>,
    /// Number of files deleted
    pub files_removed: usize,
}

impl CleanSummary {
    /// Whether the package carried any signature.
    pub fn is_empty(&self) -> bool {
        self.signature_lists.is_empty() && self.files_removed == 0
    }
}

/// Strips all signatures from an OFD package.
#[derive(Debug)]
pub struct OfdSignCleaner {
    workspace: Workspace,
}

impl OfdSignCleaner {
    /// Open `src` for cleaning.
    pub fn open(src: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_workspace(Workspace::unpack(src.as_ref())?))
    }

    /// Clean an already unpacked package.
    pub fn from_workspace(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// The scratch workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Remove every signature inside the workspace.
    pub fn clean(&mut self) -> Result<CleanSummary> {
        if !self.workspace.exists(OFD_ENTRY) {
            return Err(Error::InvalidOfd("Package has no OFD.xml".to_string()));
        }
        let mut ofd = Element::parse(&self.workspace.read_file(OFD_ENTRY)?)?;
        let mut summary = CleanSummary::default();

        for body in ofd
            .children
            .iter_mut()
            .filter(|c| c.local_name() == "DocBody")
        {
            let list_loc = body
                .child_text("Signatures")
                .map(|loc| resolve_loc(OFD_ENTRY, loc));
            body.remove_children("Signatures");
            let list_loc = match list_loc {
                Some(loc) => loc,
                None => continue,
            };

            let dir = parent_loc(&list_loc);
            let dir_name = dir.rsplit('/').next().unwrap_or_default();
            if dir_name.eq_ignore_ascii_case(SIGNS_DIR) {
                summary.files_removed += self.workspace.remove_dir(dir)?;
            }
            // Some producers keep the list outside Signs.
            if self.workspace.remove_file(&list_loc)? {
                summary.files_removed += 1;
            }
            debug!("Removed signature list {}", list_loc);
            summary.signature_lists.push(list_loc);
        }

        self.workspace.write_file(OFD_ENTRY, &ofd.to_bytes()?)?;
        Ok(summary)
    }

    /// Clean and write the result to `dest`.
    pub fn clean_to(mut self, dest: impl AsRef<Path>) -> Result<CleanSummary> {
        let summary = self.clean()?;
        self.workspace.repack_to(dest.as_ref())?;
        info!(
            "Cleared {} signature lists ({} files) into {}",
            summary.signature_lists.len(),
            summary.files_removed,
            dest.as_ref().display()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFD_XML: &str = r#"<ofd:OFD xmlns:ofd="http://www.ofdspec.org/2016"><ofd:DocBody><ofd:DocRoot>Doc_0/Document.xml</ofd:DocRoot><ofd:Signatures>Doc_0/Signs/Signatures.xml</ofd:Signatures></ofd:DocBody><ofd:DocBody><ofd:DocRoot>Doc_1/Document.xml</ofd:DocRoot><ofd:Signatures>/Doc_1/Signatures.xml</ofd:Signatures></ofd:DocBody></ofd:OFD>"#;

    fn workspace() -> Workspace {
        let ws = Workspace::new_empty().unwrap();
        ws.write_file("/OFD.xml", OFD_XML.as_bytes()).unwrap();
        ws.write_file("/Doc_0/Document.xml", b"<ofd:Document/>").unwrap();
        ws.write_file("/Doc_0/Signs/Signatures.xml", b"<ofd:Signatures/>")
            .unwrap();
        ws.write_file("/Doc_0/Signs/Sign_0/Signature.xml", b"<ofd:Signature/>")
            .unwrap();
        ws.write_file("/Doc_0/Signs/Sign_0/SignedValue.dat", b"sv").unwrap();
        ws.write_file("/Doc_1/Document.xml", b"<ofd:Document/>").unwrap();
        ws.write_file("/Doc_1/Signatures.xml", b"<ofd:Signatures/>").unwrap();
        ws
    }

    #[test]
    fn test_clean_every_doc_body() {
        let mut cleaner = OfdSignCleaner::from_workspace(workspace());
        let summary = cleaner.clean().unwrap();
        assert_eq!(
            summary.signature_lists,
            vec!["/Doc_0/Signs/Signatures.xml", "/Doc_1/Signatures.xml"]
        );
        assert_eq!(summary.files_removed, 4);

        let ws = cleaner.workspace();
        assert_eq!(
            ws.list_files().unwrap(),
            vec!["/Doc_0/Document.xml", "/Doc_1/Document.xml", "/OFD.xml"]
        );
        let ofd = Element::parse(&ws.read_file("/OFD.xml").unwrap()).unwrap();
        assert!(ofd
            .children_named("DocBody")
            .all(|body| body.child("Signatures").is_none()));
    }

    #[test]
    fn test_clean_unsigned_is_noop() {
        let ws = Workspace::new_empty().unwrap();
        ws.write_file(
            "/OFD.xml",
            br#"<ofd:OFD xmlns:ofd="http://www.ofdspec.org/2016"><ofd:DocBody><ofd:DocRoot>Doc_0/Document.xml</ofd:DocRoot></ofd:DocBody></ofd:OFD>"#,
        )
        .unwrap();
        let summary = OfdSignCleaner::from_workspace(ws).clean().unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn test_missing_entry_file() {
        let mut cleaner = OfdSignCleaner::from_workspace(Workspace::new_empty().unwrap());
        assert!(matches!(cleaner.clean(), Err(Error::InvalidOfd(_))));
    }
}
