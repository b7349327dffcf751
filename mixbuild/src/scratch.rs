//! Scratch workspace owned by a single pipeline run.
//!
//! The workspace is a uniquely named temporary directory. It is removed when
//! the [`ScratchWorkspace`] is dropped, which covers normal completion,
//! every error return and an interrupt observed between stages.

use crate::error::{MixError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "mixbuild.";

/// Temporary directory tree holding extracted artifacts for one run.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl ScratchWorkspace {
    /// Create a workspace in the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create() -> Result<Self> {
        Self::from_temp_dir(tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?)
    }

    /// Create a workspace inside `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_in(parent: &Utf8Path) -> Result<Self> {
        Self::from_temp_dir(
            tempfile::Builder::new()
                .prefix(SCRATCH_PREFIX)
                .tempdir_in(parent)?,
        )
    }

    fn from_temp_dir(dir: TempDir) -> Result<Self> {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).map_err(|e| {
            MixError::NonUtf8Path {
                path: e.into_path_buf().display().to_string(),
            }
        })?;
        debug!("created scratch workspace {root}");
        Ok(Self { dir, root })
    }

    /// Root of the workspace.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Members extracted from the system target-files archive.
    #[must_use]
    pub fn system_artifacts(&self) -> Utf8PathBuf {
        self.root.join("system_artifacts")
    }

    /// Members extracted from the device target-files archive.
    #[must_use]
    pub fn device_artifacts(&self) -> Utf8PathBuf {
        self.root.join("device_artifacts")
    }

    /// Contents of the device image archive, later re-zipped.
    #[must_use]
    pub fn device_images(&self) -> Utf8PathBuf {
        self.root.join("device_images")
    }

    /// Extracted host tools.
    #[must_use]
    pub fn host_tools(&self) -> Utf8PathBuf {
        self.root.join("otatools")
    }

    /// Private copy of the system target-files archive handed to the patcher.
    #[must_use]
    pub fn system_target_files_copy(&self) -> Utf8PathBuf {
        self.root.join("system_target_files.zip")
    }

    /// Destination of the composed image archive.
    #[must_use]
    pub fn composed_archive(&self) -> Utf8PathBuf {
        self.root.join("mixed_device_img.zip")
    }

    /// Remove the workspace now, reporting any failure.
    ///
    /// Dropping the workspace also removes it but silently ignores errors.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the tree cannot be removed.
    pub fn close(self) -> Result<()> {
        debug!("removing scratch workspace {}", self.root);
        self.dir.close()?;
        Ok(())
    }
}
