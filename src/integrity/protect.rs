//! Protect and verify flows over an OFD package.

use super::{Manifest, ManifestEntry, ProtectSigner, ProtectVerifier};
use crate::config::ProtectConfig;
use crate::error::{Error, Result};
use crate::package::Workspace;
use crate::signatures::VerifyResult;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::Path;

/// Files excluded from the manifest and from the undeclared-file scan:
/// the manifest itself and the signature over it.
#[derive(Debug, Clone)]
struct Exemptions {
    paths: BTreeSet<String>,
}

impl Exemptions {
    fn new(manifest_loc: &str, signed_value_loc: &str) -> Self {
        let paths = [manifest_loc, signed_value_loc]
            .into_iter()
            .map(normalize)
            .collect();
        Self { paths }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

fn normalize(loc: &str) -> String {
    format!("/{}", loc.trim_start_matches('/'))
}

/// Outcome of verifying a protected package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Verification of the manifest signature
    pub signature: VerifyResult,
    /// Files present in the package but absent from the manifest
    pub unexpected_files: Vec<String>,
    /// Files declared in the manifest but absent from the package
    pub missing_files: Vec<String>,
}

impl IntegrityReport {
    /// Whether no undeclared file was found.
    pub fn no_extra_files(&self) -> bool {
        self.unexpected_files.is_empty()
    }

    /// Signature valid and nothing smuggled in.
    pub fn passed(&self) -> bool {
        self.signature.passed && self.no_extra_files()
    }
}

/// Anti-tampering protection driver.
#[derive(Debug, Clone, Default)]
pub struct OfdIntegrity {
    config: ProtectConfig,
}

impl OfdIntegrity {
    /// Create a driver with `config`.
    pub fn new(config: ProtectConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &ProtectConfig {
        &self.config
    }

    /// Protect `src`, writing the protected package to `dest`.
    ///
    /// `dest` is only written once everything else succeeded; the scratch
    /// workspace is removed on every exit path.
    pub fn protect(
        &self,
        src: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        signer: &dyn ProtectSigner,
    ) -> Result<Manifest> {
        let src = src.as_ref();
        if !src.is_file() {
            return Err(Error::InvalidArgument(format!(
                "Package to protect not found: {}",
                src.display()
            )));
        }
        let workspace = Workspace::unpack(src)?;
        let manifest = self.protect_workspace(&workspace, signer)?;
        workspace.repack_to(dest.as_ref())?;
        info!(
            "Protected {} files into {}",
            manifest.files.len(),
            dest.as_ref().display()
        );
        Ok(manifest)
    }

    /// Build, sign and store the manifest inside an unpacked workspace.
    pub fn protect_workspace(
        &self,
        workspace: &Workspace,
        signer: &dyn ProtectSigner,
    ) -> Result<Manifest> {
        let manifest_loc = normalize(&self.config.manifest_loc);
        let signed_value_loc = normalize(&self.config.signed_value_loc);
        let exemptions = Exemptions::new(&manifest_loc, &signed_value_loc);

        // Manifest takes ID 1; files follow in traversal order.
        let mut next_id = 1u32;
        let mut files = Vec::new();
        for path in workspace.list_files()? {
            if exemptions.is_exempt(&path) {
                continue;
            }
            next_id += 1;
            files.push(ManifestEntry {
                id: next_id.to_string(),
                path,
            });
        }
        debug!("Manifest declares {} files", files.len());

        let manifest = Manifest {
            id: "1".to_string(),
            creator_name: self.config.creator_name.clone(),
            version: self.config.tool_version.clone(),
            creation_date: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            signed_value_loc: signed_value_loc.clone(),
            files,
        };

        workspace.write_file(&manifest_loc, &manifest.to_bytes()?)?;
        let signed_value = signer.digest_then_sign(&workspace.resolve(&manifest_loc)?)?;
        workspace.write_file(&signed_value_loc, &signed_value)?;
        debug!("Manifest signature written to {}", signed_value_loc);

        Ok(manifest)
    }

    /// Verify a protected package.
    ///
    /// Both the signature check and the undeclared-file scan always run,
    /// and both results are reported.
    pub fn verify(
        &self,
        ofd_file: impl AsRef<Path>,
        verifier: &dyn ProtectVerifier,
    ) -> Result<IntegrityReport> {
        let workspace = Workspace::unpack(ofd_file.as_ref())?;
        self.verify_workspace(&workspace, verifier)
    }

    /// Verify an unpacked workspace.
    pub fn verify_workspace(
        &self,
        workspace: &Workspace,
        verifier: &dyn ProtectVerifier,
    ) -> Result<IntegrityReport> {
        let manifest_loc = normalize(&self.config.manifest_loc);
        if !workspace.exists(&manifest_loc) {
            return Err(Error::ProtocolState(format!(
                "Package is not protected: {} not found",
                manifest_loc
            )));
        }
        let manifest = Manifest::parse(&workspace.read_file(&manifest_loc)?)?;
        let signed_value_loc = normalize(&manifest.signed_value_loc);
        if !workspace.exists(&signed_value_loc) {
            return Err(Error::ProtocolState(format!(
                "Manifest signature {} not found",
                signed_value_loc
            )));
        }

        let signed_value = workspace.read_file(&signed_value_loc)?;
        let signature =
            verifier.digest_then_verify(&workspace.resolve(&manifest_loc)?, &signed_value)?;
        if !signature.passed {
            warn!(
                "Manifest signature invalid: {}",
                signature.reason().unwrap_or_default()
            );
        }

        let exemptions = Exemptions::new(&manifest_loc, &signed_value_loc);
        let present = workspace.list_files()?;

        let unexpected_files: Vec<String> = present
            .iter()
            .filter(|p| !exemptions.is_exempt(p) && !manifest.declares(p))
            .cloned()
            .collect();
        for path in &unexpected_files {
            warn!("Undeclared file in protected package: {}", path);
        }

        let present: BTreeSet<&str> = present.iter().map(String::as_str).collect();
        let missing_files: Vec<String> = manifest
            .files
            .iter()
            .map(|f| normalize(&f.path))
            .filter(|p| !present.contains(p.as_str()))
            .collect();
        if !missing_files.is_empty() {
            debug!("{} declared files are missing", missing_files.len());
        }

        Ok(IntegrityReport {
            signature,
            unexpected_files,
            missing_files,
        })
    }
}
