//! Document signing.
//!
//! [`OfdSigner`] adds one signature to the default document of a package.
//! All work happens in a scratch workspace; the destination file is written
//! by the final repack only, so a failure anywhere leaves it untouched.

use super::container::SignatureContainer;
use super::document::OfdDocument;
use super::id::{provider_for, NumberFormatSignId, SignIdProvider};
use super::records::{
    Reference, SignatureEntry, SignatureList, SignatureRecord, SignedInfo,
    SIGNATURE_DATE_TIME_FORMAT,
};
use super::stamp::StampAppearance;
use super::types::SignMode;
use crate::config::SignConfig;
use crate::error::{Error, Result};
use crate::package::{resolve_loc, Workspace};
use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Name of the signature list inside `<doc>/Signs/`.
pub const SIGNATURES_FILE: &str = "Signatures.xml";
/// Name of a signature record inside its `Sign_N` directory.
pub const SIGNATURE_FILE: &str = "Signature.xml";
/// Name of the signed value inside its `Sign_N` directory.
pub const SIGNED_VALUE_FILE: &str = "SignedValue.dat";
/// Name of the seal inside its `Sign_N` directory.
pub const SEAL_FILE: &str = "Seal.esl";

type FileFilter = Box<dyn Fn(&str) -> bool>;

/// Load every signature record listed in `list`.
pub(crate) fn load_records(
    workspace: &Workspace,
    signatures_loc: &str,
    list: &SignatureList,
) -> Result<Vec<(SignatureEntry, String, SignatureRecord)>> {
    list.entries
        .iter()
        .map(|entry| {
            let loc = resolve_loc(signatures_loc, &entry.base_loc);
            let record = SignatureRecord::parse(&workspace.read_file(&loc)?)?;
            Ok((entry.clone(), loc, record))
        })
        .collect()
}

/// Adds a signature to an OFD document.
pub struct OfdSigner {
    workspace: Workspace,
    document: OfdDocument,
    container: Box<dyn SignatureContainer>,
    config: SignConfig,
    ids: Box<dyn SignIdProvider>,
    list: SignatureList,
    appearances: Vec<Box<dyn StampAppearance>>,
    filter: Option<FileFilter>,
}

impl fmt::Debug for OfdSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfdSigner")
            .field("doc_root", &self.document.doc_root())
            .field("config", &self.config)
            .field("max_sign_id", &self.ids.get())
            .field("appearances", &self.appearances.len())
            .finish()
    }
}

impl OfdSigner {
    /// Open `src` for signing.
    ///
    /// Fails with [`Error::ProtocolState`] when an existing signature
    /// already protects the signature list.
    pub fn open(
        src: impl AsRef<Path>,
        container: impl SignatureContainer + 'static,
        config: SignConfig,
    ) -> Result<Self> {
        Self::from_workspace(Workspace::unpack(src.as_ref())?, container, config)
    }

    /// Sign an already unpacked package.
    pub fn from_workspace(
        workspace: Workspace,
        container: impl SignatureContainer + 'static,
        config: SignConfig,
    ) -> Result<Self> {
        let document = OfdDocument::load(&workspace)?;
        let mut signer = Self {
            workspace,
            document,
            container: Box::new(container),
            ids: provider_for(config.id_format),
            config,
            list: SignatureList::default(),
            appearances: Vec::new(),
            filter: None,
        };
        signer.pre_check()?;
        Ok(signer)
    }

    /// Replace the signature ID provider. It is reseeded from the document.
    pub fn with_id_provider(mut self, mut ids: Box<dyn SignIdProvider>) -> Result<Self> {
        if let Some(max) = &self.list.max_sign_id {
            ids.set_current_max(max)?;
        }
        self.ids = ids;
        Ok(self)
    }

    /// Add a stamp appearance.
    pub fn with_appearance(mut self, appearance: impl StampAppearance + 'static) -> Self {
        self.appearances.push(Box::new(appearance));
        self
    }

    /// Only protect files for which `filter` returns true.
    pub fn with_file_filter(mut self, filter: impl Fn(&str) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// The document being signed.
    pub fn document(&self) -> &OfdDocument {
        &self.document
    }

    /// The scratch workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn pre_check(&mut self) -> Result<()> {
        let signatures_loc = match self.document.signatures_loc() {
            Some(loc) => loc.to_string(),
            None => return Ok(()),
        };
        self.list = SignatureList::parse(&self.workspace.read_file(&signatures_loc)?)?;

        let max_id = match &self.list.max_sign_id {
            Some(id) => Some(id.clone()),
            None => self.list.entries.last().map(|e| e.id.clone()),
        };
        if let Some(max_id) = max_id {
            self.ids.set_current_max(&max_id)?;
        }

        for (entry, _, record) in load_records(&self.workspace, &signatures_loc, &self.list)? {
            if record.references_file(&signatures_loc) {
                return Err(Error::ProtocolState(format!(
                    "Signature {} protects {}; no further signatures may be added",
                    entry.id, signatures_loc
                )));
            }
        }
        debug!(
            "Document has {} signatures, next ID follows {}",
            self.list.entries.len(),
            self.ids.get()
        );
        Ok(())
    }

    fn next_sign_dir(&self, signs_dir: &str) -> Result<String> {
        let used: BTreeSet<String> = self
            .workspace
            .list_files()?
            .into_iter()
            .filter_map(|f| {
                f.strip_prefix(signs_dir)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .and_then(|rest| rest.split_once('/'))
                    .map(|(dir, _)| dir.to_string())
            })
            .collect();
        let n = (0..)
            .find(|n| !used.contains(&format!("Sign_{}", n)))
            .unwrap_or_default();
        Ok(format!("{}/Sign_{}", signs_dir, n))
    }

    /// Sign inside the workspace and return the new list entry.
    pub fn exe_sign(&mut self) -> Result<SignatureEntry> {
        if let Some(rel) = &self.config.relative {
            if self.list.entry(rel).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "Relative signature {} does not exist",
                    rel
                )));
            }
        }

        let signs_dir = format!("{}/Signs", self.document.doc_dir());
        let signatures_loc = match self.document.signatures_loc() {
            Some(loc) => loc.to_string(),
            None => {
                let loc = format!("{}/{}", signs_dir, SIGNATURES_FILE);
                self.document.register_signatures(&self.workspace, &loc)?;
                loc
            }
        };

        let sign_dir = self.next_sign_dir(&signs_dir)?;
        let signature_loc = format!("{}/{}", sign_dir, SIGNATURE_FILE);
        let signed_value_loc = format!("{}/{}", sign_dir, SIGNED_VALUE_FILE);

        let seal_loc = match self.container.seal()? {
            Some(seal) => {
                let loc = format!("{}/{}", sign_dir, SEAL_FILE);
                self.workspace.write_file(&loc, &seal)?;
                Some(loc)
            }
            None => None,
        };

        let mut stamp_ids = NumberFormatSignId::new();
        let mut stamp_annots = Vec::new();
        for appearance in &self.appearances {
            stamp_annots.extend(appearance.appearance(&self.document, &mut stamp_ids)?);
        }

        let entry = SignatureEntry {
            id: self.ids.increment_and_get()?,
            sig_type: self.container.kind(),
            base_loc: signature_loc.clone(),
            relative: self.config.relative.clone(),
        };
        self.list.push(entry.clone());
        self.workspace
            .write_file(&signatures_loc, &self.list.to_bytes()?)?;

        let digest = self.container.digest_algorithm();
        let mut references = Vec::new();
        for file in self.workspace.list_files()? {
            if self.config.sign_mode == SignMode::ContinueSign && file == signatures_loc {
                continue;
            }
            if let Some(filter) = &self.filter {
                if !filter(&file) {
                    continue;
                }
            }
            let data = self.workspace.read_file(&file)?;
            references.push(Reference {
                check_value: digest.digest(&data),
                file_ref: file,
            });
        }
        debug!("Signature {} protects {} files", entry.id, references.len());

        let record = SignatureRecord {
            signed_info: SignedInfo {
                provider: self.config.provider.clone(),
                signature_method: self.container.signature_algorithm().to_string(),
                signature_date_time: chrono::Utc::now()
                    .format(SIGNATURE_DATE_TIME_FORMAT)
                    .to_string(),
                check_method: digest.oid().to_string(),
                references,
                stamp_annots,
                seal_loc,
            },
            signed_value_loc: signed_value_loc.clone(),
        };
        let tbs = record.to_bytes()?;
        self.workspace.write_file(&signature_loc, &tbs)?;

        let property_info = self
            .config
            .property_info
            .clone()
            .unwrap_or_else(|| signature_loc.clone());
        let signed_value = self.container.sign(&tbs, &property_info)?;
        self.workspace.write_file(&signed_value_loc, &signed_value)?;

        info!(
            "Added {} signature {} at {}",
            entry.sig_type.as_str(),
            entry.id,
            signature_loc
        );
        Ok(entry)
    }

    /// Sign and write the signed package to `dest`.
    pub fn sign_to(mut self, dest: impl AsRef<Path>) -> Result<SignatureEntry> {
        let entry = self.exe_sign()?;
        self.workspace.repack_to(dest.as_ref())?;
        Ok(entry)
    }
}
