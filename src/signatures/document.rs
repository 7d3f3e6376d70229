//! Read-only view of the OFD document structure needed for signing.
//!
//! Only the default document (the first `DocBody`) is considered: its root
//! file, its page list with page sizes, and the location of its signature
//! list.

use crate::error::{Error, Result};
use crate::geometry::StBox;
use crate::package::{parent_loc, resolve_loc, Workspace};
use crate::xml::Element;
use log::debug;

/// Location of the package entry file.
pub const OFD_ENTRY: &str = "/OFD.xml";

/// Page size used when a document declares none (A4).
pub const DEFAULT_PAGE_BOX: StBox = StBox {
    x: 0.0,
    y: 0.0,
    width: 210.0,
    height: 297.0,
};

/// A page of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// Page object ID
    pub id: String,
    /// Container-absolute location of the page content
    pub base_loc: String,
    /// Physical page box
    pub size: StBox,
}

/// Structure of the default document of an OFD package.
#[derive(Debug, Clone)]
pub struct OfdDocument {
    doc_root: String,
    signatures_loc: Option<String>,
    pages: Vec<PageInfo>,
}

impl OfdDocument {
    /// Read the document structure from an unpacked package.
    pub fn load(workspace: &Workspace) -> Result<Self> {
        if !workspace.exists(OFD_ENTRY) {
            return Err(Error::InvalidOfd("Package has no OFD.xml".to_string()));
        }
        let ofd = Element::parse(&workspace.read_file(OFD_ENTRY)?)?;
        let body = ofd
            .child("DocBody")
            .ok_or_else(|| Error::InvalidOfd("OFD.xml has no DocBody".to_string()))?;
        let doc_root = body
            .child_text("DocRoot")
            .map(|loc| resolve_loc(OFD_ENTRY, loc))
            .ok_or_else(|| Error::InvalidOfd("DocBody has no DocRoot".to_string()))?;
        let signatures_loc = body
            .child_text("Signatures")
            .map(|loc| resolve_loc(OFD_ENTRY, loc));

        let document = Element::parse(&workspace.read_file(&doc_root)?)?;
        let default_box = match document
            .child("CommonData")
            .and_then(|c| c.child("PageArea"))
            .and_then(|a| a.child_text("PhysicalBox"))
        {
            Some(text) => text.parse()?,
            None => DEFAULT_PAGE_BOX,
        };

        let mut pages = Vec::new();
        if let Some(list) = document.child("Pages") {
            for page in list.children_named("Page") {
                let base_loc = resolve_loc(&doc_root, page.required_attr("BaseLoc")?);
                let size = page_box(workspace, &base_loc)?.unwrap_or(default_box);
                pages.push(PageInfo {
                    id: page.required_attr("ID")?.to_string(),
                    base_loc,
                    size,
                });
            }
        }

        debug!("Document {} has {} pages", doc_root, pages.len());
        Ok(Self {
            doc_root,
            signatures_loc,
            pages,
        })
    }

    /// Location of `Document.xml`.
    pub fn doc_root(&self) -> &str {
        &self.doc_root
    }

    /// Directory of the document, e.g. `/Doc_0`.
    pub fn doc_dir(&self) -> &str {
        parent_loc(&self.doc_root)
    }

    /// Location of the signature list, when the document has been signed.
    pub fn signatures_loc(&self) -> Option<&str> {
        self.signatures_loc.as_deref()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page by 1-based index.
    pub fn page(&self, index: usize) -> Result<&PageInfo> {
        index
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Page {} out of range (document has {} pages)",
                    index,
                    self.pages.len()
                ))
            })
    }

    /// Object ID of the page at a 1-based index.
    pub fn page_object_id(&self, index: usize) -> Result<&str> {
        Ok(self.page(index)?.id.as_str())
    }

    /// Physical box of the page at a 1-based index.
    pub fn page_size(&self, index: usize) -> Result<StBox> {
        Ok(self.page(index)?.size)
    }

    /// Point `OFD.xml` at a newly created signature list.
    pub fn register_signatures(&mut self, workspace: &Workspace, loc: &str) -> Result<()> {
        let mut ofd = Element::parse(&workspace.read_file(OFD_ENTRY)?)?;
        let body = ofd
            .child_mut("DocBody")
            .ok_or_else(|| Error::InvalidOfd("OFD.xml has no DocBody".to_string()))?;
        match body.child_mut("Signatures") {
            Some(existing) => existing.text = Some(loc.to_string()),
            None => body.push(Element::ofd("Signatures").with_text(loc)),
        }
        workspace.write_file(OFD_ENTRY, &ofd.to_bytes()?)?;
        self.signatures_loc = Some(loc.to_string());
        debug!("Registered signature list {}", loc);
        Ok(())
    }
}

fn page_box(workspace: &Workspace, content_loc: &str) -> Result<Option<StBox>> {
    if !workspace.exists(content_loc) {
        return Ok(None);
    }
    let page = Element::parse(&workspace.read_file(content_loc)?)?;
    page.child("Area")
        .and_then(|a| a.child_text("PhysicalBox"))
        .map(str::parse)
        .transpose()
}
