//! Legacy ABI patching of the system image.
//!
//! The patch procedure is an external script that mutates a system
//! target-files archive in place. It always works on a private copy in the
//! scratch workspace; the system build directory is never written to.

use crate::archive::extraction::{ArchiveExtractor, Members};
use crate::error::{MixError, Result};
use crate::exec::{CommandExecutor, ToolEnv, failure_message};
use crate::layout::SYSTEM_IMAGE;
use crate::scratch::ScratchWorkspace;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;

/// Inputs of a single patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest<'a> {
    /// Original system target-files archive.
    pub system_target_files: &'a Utf8Path,
    /// Vendor version handed to the script with `-v`.
    pub vendor_version: &'a str,
    /// Device security patch level, passed only when it differs from the
    /// system level.
    pub device_spl: Option<&'a str>,
}

/// Build the argument list of the patch script.
///
/// # Examples
///
/// ```
/// use mixbuild::patcher::patch_arguments;
///
/// assert_eq!(
///     patch_arguments("28", "/tmp/sys.zip", Some("2023-02-01")),
///     vec!["-v", "28", "/tmp/sys.zip", "2023-02-01"]
/// );
/// assert_eq!(patch_arguments("28", "/tmp/sys.zip", None), vec!["-v", "28", "/tmp/sys.zip"]);
/// ```
#[must_use]
pub fn patch_arguments<'a>(
    vendor_version: &'a str,
    archive: &'a str,
    device_spl: Option<&'a str>,
) -> Vec<&'a str> {
    let mut args = vec!["-v", vendor_version, archive];
    args.extend(device_spl);
    args
}

/// Applies the configured patch script to a copy of the system archive.
pub struct SystemImagePatcher<'a> {
    executor: &'a dyn CommandExecutor,
    extractor: &'a dyn ArchiveExtractor,
    script: &'a Utf8Path,
    env: &'a ToolEnv,
}

impl<'a> SystemImagePatcher<'a> {
    /// Create a patcher running `script`.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        extractor: &'a dyn ArchiveExtractor,
        script: &'a Utf8Path,
        env: &'a ToolEnv,
    ) -> Self {
        Self {
            executor,
            extractor,
            script,
            env,
        }
    }

    /// Patch the system image and refresh the extracted copy.
    ///
    /// Returns the path of the patched `system.img` inside the workspace's
    /// system artifacts directory.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::PatchFailed`] if the script exits unsuccessfully,
    /// [`MixError::ToolSpawn`] if it cannot be started, and extraction or
    /// I/O errors from copying and re-extracting.
    pub fn patch(
        &self,
        request: &PatchRequest<'_>,
        scratch: &ScratchWorkspace,
    ) -> Result<Utf8PathBuf> {
        let copy = scratch.system_target_files_copy();
        debug!("copying {} to {copy}", request.system_target_files);
        fs::copy(request.system_target_files, &copy)?;
        ensure_owner_writable(&copy)?;

        let args = patch_arguments(request.vendor_version, copy.as_str(), request.device_spl);
        info!(
            "patching system image for vendor version {}",
            request.vendor_version
        );
        let output = self.executor.run(self.script.as_str(), &args, self.env)?;
        if !output.status.success() {
            return Err(MixError::PatchFailed {
                script: self.script.to_owned(),
                message: failure_message(&output),
            });
        }

        let artifacts = scratch.system_artifacts();
        self.extractor
            .extract(&copy, &Members::only([SYSTEM_IMAGE]), &artifacts)?;
        Ok(artifacts.join(SYSTEM_IMAGE))
    }
}

/// Add the owner write bit so the script can rewrite the copy in place.
///
/// `fs::copy` carries over the source mode, and cached build outputs are
/// often read-only.
#[cfg(unix)]
fn ensure_owner_writable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o200 == 0 {
        permissions.set_mode(mode | 0o200);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_owner_writable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}
