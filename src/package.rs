//! OFD package workspace.
//!
//! An OFD file is a zip container. Signing and protection work on an
//! unpacked copy in a scratch directory; the delivered output is only
//! touched by the final [`Workspace::repack_to`], which writes a sibling
//! temporary file and renames it into place.
//!
//! Paths handed to and returned from this module are container-absolute
//! (`/Doc_0/Document.xml`), always `/`-separated.

use crate::error::{Error, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Unpacked OFD container in a scratch directory.
///
/// The directory is removed when the workspace is dropped, on every exit
/// path including errors and panics.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new_empty() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("ofd-tmp-").tempdir()?;
        Ok(Self { dir })
    }

    /// Unpack an OFD container into a fresh workspace.
    pub fn unpack(ofd_file: impl AsRef<Path>) -> Result<Self> {
        let ofd_file = ofd_file.as_ref();
        let workspace = Self::new_empty()?;
        let mut archive = ZipArchive::new(File::open(ofd_file)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let rel = entry.enclosed_name().ok_or_else(|| {
                Error::Zip(format!("Entry '{}' escapes the container root", entry.name()))
            })?;
            let target = workspace.dir.path().join(rel);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }

        debug!(
            "Unpacked {} ({} entries) into {}",
            ofd_file.display(),
            archive.len(),
            workspace.dir.path().display()
        );
        Ok(workspace)
    }

    /// Root directory of the workspace on disk.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Map a container-absolute location onto the scratch directory.
    ///
    /// Locations containing `..` or other non-normal components are rejected.
    pub fn resolve(&self, loc: &str) -> Result<PathBuf> {
        let mut path = self.dir.path().to_path_buf();
        for component in Path::new(loc.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "Location '{}' escapes the container root",
                        loc
                    )))
                }
            }
        }
        Ok(path)
    }

    /// Whether a file exists at the location.
    pub fn exists(&self, loc: &str) -> bool {
        self.resolve(loc).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read a file.
    pub fn read_file(&self, loc: &str) -> Result<Vec<u8>> {
        let path = self.resolve(loc)?;
        fs::read(&path).map_err(|e| {
            Error::Io(io::Error::new(e.kind(), format!("Cannot read {}: {}", loc, e)))
        })
    }

    /// Write a file, creating parent directories as needed.
    pub fn write_file(&self, loc: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(loc)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }

    /// Delete a file. Returns `false` when there was nothing to delete.
    pub fn remove_file(&self, loc: &str) -> Result<bool> {
        let path = self.resolve(loc)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Delete a directory and everything below it, returning the number of
    /// files removed.
    pub fn remove_dir(&self, loc: &str) -> Result<usize> {
        let path = self.resolve(loc)?;
        if path == self.dir.path() {
            return Err(Error::InvalidArgument(
                "Refusing to remove the container root".to_string(),
            ));
        }
        if !path.is_dir() {
            return Ok(0);
        }
        let mut files = Vec::new();
        walk(&path, "", &mut files)?;
        fs::remove_dir_all(&path)?;
        Ok(files.len())
    }

    /// List every file, depth-first with entries sorted by name at each level.
    pub fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        walk(self.dir.path(), "", &mut files)?;
        Ok(files)
    }

    /// Zip the workspace into `dest`, replacing it atomically.
    pub fn repack_to(&self, dest: impl AsRef<Path>) -> Result<()> {
        let dest = dest.as_ref();
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let staged = NamedTempFile::new_in(&parent)?;
        {
            let mut zip = ZipWriter::new(staged.as_file());
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for loc in self.list_files()? {
                let data = self.read_file(&loc)?;
                zip.start_file(loc.trim_start_matches('/'), options)?;
                zip.write_all(&data)?;
            }
            zip.finish()?;
        }
        staged.persist(dest).map_err(|e| Error::Io(e.error))?;

        debug!("Repacked workspace into {}", dest.display());
        Ok(())
    }
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let loc = format!("{}/{}", prefix, name);
        if entry.file_type()?.is_dir() {
            walk(&entry.path(), &loc, out)?;
        } else {
            out.push(loc);
        }
    }
    Ok(())
}

/// Resolve `loc` against the directory of `base`.
///
/// Absolute locations are returned unchanged; relative ones are joined to
/// the parent of `base` with `.` and `..` folded away.
///
/// ```
/// use ofd_sign::package::resolve_loc;
///
/// assert_eq!(resolve_loc("/Doc_0/Signs/Signatures.xml", "Sign_0/Signature.xml"),
///            "/Doc_0/Signs/Sign_0/Signature.xml");
/// assert_eq!(resolve_loc("/Doc_0/Document.xml", "/OFD.xml"), "/OFD.xml");
/// ```
pub fn resolve_loc(base: &str, loc: &str) -> String {
    if loc.starts_with('/') {
        return loc.to_string();
    }
    let mut parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    parts.pop();
    for seg in loc.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Directory part of a container-absolute location, without trailing slash.
pub fn parent_loc(loc: &str) -> &str {
    match loc.rfind('/') {
        Some(0) | None => "",
        Some(idx) => &loc[..idx],
    }
}
