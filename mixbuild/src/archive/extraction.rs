//! Member extraction from zip archives.
//!
//! Target-files archives are large, so only the members a stage needs are
//! pulled out. Repeating an extraction overwrites files already present in
//! the destination, which is how a patched system image replaces the
//! original one.

use super::is_safe_entry_name;
use crate::error::{MixError, Result};
use camino::Utf8Path;
use log::debug;
use std::fs::{self, File};
use std::io::{self, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Selection of archive members to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Members {
    /// Every entry in the archive.
    All,
    /// Only the named entries; each must be present.
    Only(Vec<String>),
}

impl Members {
    /// Select the given member names.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixbuild::archive::extraction::Members;
    ///
    /// let members = Members::only(["IMAGES/system.img"]);
    /// assert_eq!(members, Members::Only(vec!["IMAGES/system.img".to_owned()]));
    /// ```
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }
}

/// Trait for extracting archive members, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract `members` of the archive at `archive` into `dest`.
    ///
    /// `dest` is created if absent. Returns the names of the extracted
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::MissingInput`] if the archive does not exist,
    /// [`MixError::MissingMember`] if a requested member is absent,
    /// [`MixError::UnsafeEntry`] if an entry would escape `dest`, and
    /// [`MixError::Archive`] or [`MixError::Io`] on read or write failures.
    fn extract(&self, archive: &Utf8Path, members: &Members, dest: &Utf8Path)
    -> Result<Vec<String>>;
}

/// Default extractor backed by the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive: &Utf8Path,
        members: &Members,
        dest: &Utf8Path,
    ) -> Result<Vec<String>> {
        let file = File::open(archive).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MixError::MissingInput {
                what: "archive",
                path: archive.to_owned(),
            },
            _ => MixError::Io(e),
        })?;
        let mut zip = ZipArchive::new(file).map_err(|e| MixError::archive(archive, e))?;
        fs::create_dir_all(dest)?;

        let mut extracted = Vec::new();
        match members {
            Members::All => {
                for index in 0..zip.len() {
                    let entry = zip
                        .by_index(index)
                        .map_err(|e| MixError::archive(archive, e))?;
                    let meta = EntryMeta {
                        name: entry.name().to_owned(),
                        is_dir: entry.is_dir(),
                        unix_mode: entry.unix_mode(),
                    };
                    unpack(archive, &meta, entry, dest)?;
                    extracted.push(meta.name);
                }
            }
            Members::Only(names) => {
                for name in names {
                    let entry = zip.by_name(name).map_err(|e| match e {
                        ZipError::FileNotFound => MixError::MissingMember {
                            archive: archive.to_owned(),
                            member: name.clone(),
                        },
                        other => MixError::archive(archive, other),
                    })?;
                    let meta = EntryMeta {
                        name: entry.name().to_owned(),
                        is_dir: entry.is_dir(),
                        unix_mode: entry.unix_mode(),
                    };
                    unpack(archive, &meta, entry, dest)?;
                    extracted.push(meta.name);
                }
            }
        }

        debug!("extracted {} member(s) of {archive} into {dest}", extracted.len());
        Ok(extracted)
    }
}

/// Entry attributes captured before the entry is consumed as a reader.
struct EntryMeta {
    name: String,
    is_dir: bool,
    unix_mode: Option<u32>,
}

fn unpack(
    archive: &Utf8Path,
    meta: &EntryMeta,
    mut reader: impl Read,
    dest: &Utf8Path,
) -> Result<()> {
    if !is_safe_entry_name(&meta.name) {
        return Err(MixError::UnsafeEntry {
            archive: archive.to_owned(),
            entry: meta.name.clone(),
        });
    }

    let out_path = dest.join(&meta.name);
    if meta.is_dir {
        fs::create_dir_all(&out_path)?;
        return Ok(());
    }
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    // A previous extraction may have left a read-only file behind.
    if out_path.exists() {
        fs::remove_file(&out_path)?;
    }

    let mut out = File::create(&out_path)?;
    io::copy(&mut reader, &mut out)?;
    drop(out);

    restore_mode(&out_path, meta.unix_mode)
}

#[cfg(unix)]
fn restore_mode(path: &Utf8Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        // Owner keeps read/write so later stages can overwrite the file.
        let permissions = fs::Permissions::from_mode((mode & 0o7777) | 0o600);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn restore_mode(_path: &Utf8Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
