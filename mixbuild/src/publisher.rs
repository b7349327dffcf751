//! Publication of the mixed build into the distribution directory.
//!
//! The device build directory is mirrored into the output directory without
//! its `logs` trees, then the device image archive is overwritten with the
//! composed archive under its original file name.

use crate::error::{MixError, Result};
use crate::layout::PUBLISH_EXCLUDES;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io;
use walkdir::{DirEntry, WalkDir};

/// Summary of a completed publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Number of files copied from the device build directory.
    pub files_copied: usize,
    /// Final location of the composed archive.
    pub archive: Utf8PathBuf,
}

/// Copies device build artifacts and the composed archive to `out_dir`.
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    out_dir: Utf8PathBuf,
}

impl ArtifactPublisher {
    /// Create a publisher writing into `out_dir`.
    #[must_use]
    pub fn new(out_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// The distribution directory.
    #[must_use]
    pub fn out_dir(&self) -> &Utf8Path {
        &self.out_dir
    }

    /// Publish the device build with the composed archive in place of the
    /// original image archive named `archive_file_name`.
    ///
    /// Symlinks in the device build directory are copied as their targets.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::OutputDir`] if the output directory cannot be
    /// created and [`MixError::Io`] if copying fails.
    pub fn publish(
        &self,
        device_dir: &Utf8Path,
        composed_archive: &Utf8Path,
        archive_file_name: &str,
    ) -> Result<Publication> {
        fs::create_dir_all(&self.out_dir).map_err(|source| MixError::OutputDir {
            path: self.out_dir.clone(),
            source,
        })?;
        let skip = self.out_dir.canonicalize().ok();

        let mut files_copied = 0;
        let walker = WalkDir::new(device_dir)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| is_published(entry, skip.as_deref()));
        for entry in walker {
            let entry = entry.map_err(|e| MixError::Io(e.into()))?;
            let relative = entry
                .path()
                .strip_prefix(device_dir.as_std_path())
                .map_err(io::Error::other)?;
            let target = self.out_dir.as_std_path().join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
                files_copied += 1;
            }
        }
        debug!("copied {files_copied} file(s) from {device_dir} to {}", self.out_dir);

        let archive = self.out_dir.join(archive_file_name);
        fs::copy(composed_archive, &archive)?;
        info!("published mixed build to {}", self.out_dir);
        Ok(Publication {
            files_copied,
            archive,
        })
    }
}

/// Return false for excluded names and for the output directory itself.
fn is_published(entry: &DirEntry, out_dir: Option<&std::path::Path>) -> bool {
    if entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PUBLISH_EXCLUDES.contains(&name))
    {
        return false;
    }
    match out_dir {
        Some(out_dir) if entry.file_type().is_dir() => !entry
            .path()
            .canonicalize()
            .is_ok_and(|path| path == out_dir),
        _ => true,
    }
}
