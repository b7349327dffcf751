//! Validated run configuration.
//!
//! Everything that can be checked without opening an archive is checked
//! here, before a scratch workspace exists.

use crate::cli::Cli;
use crate::error::{MixError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// Legacy ABI patch settings. Both halves are always supplied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// Vendor version passed to the script.
    pub vendor_version: String,
    /// Script that patches a system target-files archive in place.
    pub script: Utf8PathBuf,
}

/// Typed configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixConfig {
    /// Build directory holding the system target-files archive.
    pub system_dir: Utf8PathBuf,
    /// Build directory holding the device target-files and image archives.
    pub device_dir: Utf8PathBuf,
    /// Distribution directory.
    pub out_dir: Utf8PathBuf,
    /// Compatibility checker; `None` skips verification.
    pub checker: Option<Utf8PathBuf>,
    /// Legacy ABI patch settings, if patching was requested.
    pub patch: Option<PatchConfig>,
    /// Image replacing the system build's `vbmeta.img`.
    pub vbmeta_override: Option<Utf8PathBuf>,
    /// Host tools archive.
    pub otatools: Option<Utf8PathBuf>,
    /// Directory in which the scratch workspace is created; the system
    /// temporary directory when `None`.
    pub scratch_parent: Option<Utf8PathBuf>,
}

impl MixConfig {
    /// Build and validate the configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::UnpairedOption`] when only one of `-v` and `-m` is
    /// given and [`MixError::MissingInput`] when an explicitly named file
    /// does not exist.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let patch = patch_config(
            cli.vendor_version.as_deref(),
            cli.modify_system_script.as_deref(),
        )?
        .map(|(vendor_version, script)| {
            Ok::<_, MixError>(PatchConfig {
                vendor_version: vendor_version.to_owned(),
                script: existing_file("system image patch script", script)?,
            })
        })
        .transpose()?;

        let vbmeta_override = cli
            .override_vbmeta_image
            .as_deref()
            .map(|path| existing_file("override vbmeta image", path))
            .transpose()?;
        let otatools = cli
            .otatools_zip
            .as_deref()
            .map(|path| existing_file("otatools archive", path))
            .transpose()?;

        Ok(Self {
            system_dir: cli.system_build_dir.clone(),
            device_dir: cli.device_build_dir.clone(),
            out_dir: cli.out_dir.clone(),
            checker: resolve_checker(cli.check_tool.as_deref()),
            patch,
            vbmeta_override,
            otatools,
            scratch_parent: None,
        })
    }

    /// Place the scratch workspace under `parent`.
    #[must_use]
    pub fn with_scratch_parent(mut self, parent: impl Into<Utf8PathBuf>) -> Self {
        self.scratch_parent = Some(parent.into());
        self
    }
}

/// Pair the vendor version with the patch script.
///
/// # Errors
///
/// Returns [`MixError::UnpairedOption`] when exactly one is present.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use mixbuild::config::patch_config;
///
/// assert!(patch_config(None, None).expect("valid").is_none());
/// assert!(patch_config(Some("28"), None).is_err());
/// let paired = patch_config(Some("28"), Some(Utf8Path::new("patch.sh"))).expect("valid");
/// assert!(paired.is_some());
/// ```
pub fn patch_config<'a>(
    vendor_version: Option<&'a str>,
    script: Option<&'a Utf8Path>,
) -> Result<Option<(&'a str, &'a Utf8Path)>> {
    match (vendor_version, script) {
        (Some(version), Some(script)) => Ok(Some((version, script))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(MixError::UnpairedOption {
            present: "-v",
            missing: "-m",
        }),
        (None, Some(_)) => Err(MixError::UnpairedOption {
            present: "-m",
            missing: "-v",
        }),
    }
}

/// Canonicalize an explicitly named input, which must exist.
///
/// Canonical paths keep a bare file name from being looked up on `PATH`
/// when it is later run as a command.
fn existing_file(what: &'static str, path: &Utf8Path) -> Result<Utf8PathBuf> {
    path.canonicalize_utf8()
        .map_err(|_| MixError::MissingInput {
            what,
            path: path.to_owned(),
        })
}

/// Resolve the checker path, dropping it when it does not exist.
///
/// The pipeline reports the skipped verification.
fn resolve_checker(checker: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    let checker = checker?;
    match checker.canonicalize_utf8() {
        Ok(path) => Some(path),
        Err(_) => {
            debug!("compatibility checker {checker} not found");
            None
        }
    }
}
