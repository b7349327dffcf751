//! Mixed-build pipeline orchestration.
//!
//! Stages run strictly in order: locate inputs, extract, verify, patch,
//! compose, publish. Any failure aborts the run before the next stage, so
//! the output directory is only written once every earlier stage succeeded.
//! The scratch workspace is dropped on every return path.

use crate::archive::extraction::{ArchiveExtractor, Members, ZipExtractor};
use crate::composer::{ImageComposer, VbmetaSource};
use crate::config::MixConfig;
use crate::error::{MixError, Result};
use crate::exec::{CommandExecutor, SystemCommandExecutor, ToolEnv};
use crate::interrupt;
use crate::layout::{
    BUILD_PROP, DEVICE_MEMBERS, IMG_ARCHIVE_GLOB, SYSTEM_IMAGE, TARGET_FILES_GLOB, VBMETA_IMAGE,
    VBMETA_IMAGE_NAME, system_members,
};
use crate::locator::find_unique_artifact;
use crate::output::{success_message, vbmeta_note, write_stderr_line};
use crate::patcher::{PatchRequest, SystemImagePatcher};
use crate::publisher::ArtifactPublisher;
use crate::scratch::ScratchWorkspace;
use crate::spl::PatchLevels;
use crate::verifier::CompatibilityVerifier;
use camino::Utf8PathBuf;
use log::{info, warn};
use std::io::Write;
use std::sync::atomic::AtomicBool;

/// Archives located in the build directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedInputs {
    /// System target-files archive.
    pub system_target_files: Utf8PathBuf,
    /// Device target-files archive.
    pub device_target_files: Utf8PathBuf,
    /// Device image archive.
    pub device_images: Utf8PathBuf,
    /// File name of the device image archive, reused for the output.
    pub device_images_name: String,
}

impl LocatedInputs {
    /// Find every input archive, failing on missing or ambiguous matches.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::ArtifactNotFound`] or
    /// [`MixError::AmbiguousArtifact`] for the first archive that cannot be
    /// located uniquely.
    pub fn locate(config: &MixConfig) -> Result<Self> {
        let out_dir = Some(config.out_dir.as_path());
        let system_target_files =
            find_unique_artifact(&config.system_dir, TARGET_FILES_GLOB, out_dir)?;
        let device_target_files =
            find_unique_artifact(&config.device_dir, TARGET_FILES_GLOB, out_dir)?;
        let device_images = find_unique_artifact(&config.device_dir, IMG_ARCHIVE_GLOB, out_dir)?;
        let device_images_name = device_images
            .file_name()
            .ok_or_else(|| MixError::Usage {
                reason: format!("device image archive {device_images} has no file name"),
            })?
            .to_owned();
        Ok(Self {
            system_target_files,
            device_target_files,
            device_images,
            device_images_name,
        })
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Published composed archive.
    pub archive: Utf8PathBuf,
    /// SHA-256 digest of the composed archive.
    pub sha256: String,
    /// Whether the compatibility checker ran.
    pub verified: bool,
    /// Whether the system image was patched.
    pub patched: bool,
    /// Device security patch level forwarded to the patcher, if any.
    pub spl_argument: Option<String>,
    /// Whether the device image set's `vbmeta.img` was replaced.
    pub vbmeta_replaced: bool,
}

/// Run the pipeline with the system executor and zip extractor.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub fn run(config: &MixConfig, stderr: &mut dyn Write) -> Result<RunSummary> {
    run_with(config, &SystemCommandExecutor, &ZipExtractor, stderr)
}

/// Run the pipeline with explicit collaborators.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub fn run_with(
    config: &MixConfig,
    executor: &dyn CommandExecutor,
    extractor: &dyn ArchiveExtractor,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    run_interruptible(
        config,
        executor,
        extractor,
        interrupt::signal_flag(),
        stderr,
    )
}

/// Run the pipeline, stopping between stages once `interrupted` is raised.
fn run_interruptible(
    config: &MixConfig,
    executor: &dyn CommandExecutor,
    extractor: &dyn ArchiveExtractor,
    interrupted: &AtomicBool,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    // Step 1: Locate inputs before any scratch space exists
    let inputs = LocatedInputs::locate(config)?;
    info!(
        "system target files {}, device target files {}, device images {}",
        inputs.system_target_files, inputs.device_target_files, inputs.device_images
    );
    interrupt::check(interrupted)?;

    // Step 2: Create the scratch workspace
    let scratch = match &config.scratch_parent {
        Some(parent) => ScratchWorkspace::create_in(parent)?,
        None => ScratchWorkspace::create()?,
    };

    let context = StageContext {
        config,
        inputs: &inputs,
        scratch: &scratch,
        executor,
        extractor,
        interrupted,
    };
    let summary = context.run(stderr)?;
    scratch.close()?;
    Ok(summary)
}

struct StageContext<'a> {
    config: &'a MixConfig,
    inputs: &'a LocatedInputs,
    scratch: &'a ScratchWorkspace,
    executor: &'a dyn CommandExecutor,
    extractor: &'a dyn ArchiveExtractor,
    interrupted: &'a AtomicBool,
}

impl StageContext<'_> {
    fn run(&self, stderr: &mut dyn Write) -> Result<RunSummary> {
        // Step 3: Extract host tools and archive members
        let env = self.prepare_host_tools(stderr)?;
        interrupt::check(self.interrupted)?;
        self.extract_artifacts(stderr)?;
        interrupt::check(self.interrupted)?;

        // Step 4: Verify compatibility in both directions
        let verified = self.verify(&env, stderr)?;
        interrupt::check(self.interrupted)?;

        // Step 5: Patch the system image if requested
        let system_artifacts = self.scratch.system_artifacts();
        let (system_image, spl_argument) = match &self.config.patch {
            Some(patch) => {
                let levels = PatchLevels::read(
                    &system_artifacts.join(BUILD_PROP),
                    &self.scratch.device_artifacts().join(BUILD_PROP),
                )?;
                let spl_argument = levels.mismatch_argument().map(str::to_owned);
                write_stderr_line(
                    stderr,
                    format!("Patching system image for vendor version {}...", patch.vendor_version),
                );
                let patcher =
                    SystemImagePatcher::new(self.executor, self.extractor, &patch.script, &env);
                let request = PatchRequest {
                    system_target_files: &self.inputs.system_target_files,
                    vendor_version: &patch.vendor_version,
                    device_spl: spl_argument.as_deref(),
                };
                (patcher.patch(&request, self.scratch)?, spl_argument)
            }
            None => (system_artifacts.join(SYSTEM_IMAGE), None),
        };
        interrupt::check(self.interrupted)?;

        // Step 6: Compose the mixed image archive
        write_stderr_line(stderr, "Composing mixed image archive...");
        let system_vbmeta = system_artifacts.join(VBMETA_IMAGE);
        let vbmeta = VbmetaSource::select(self.config.vbmeta_override.as_deref(), &system_vbmeta);
        let composed = ImageComposer.compose(
            &self.scratch.device_images(),
            &system_image,
            vbmeta,
            &self.scratch.composed_archive(),
        )?;
        write_stderr_line(
            stderr,
            format!(
                "  {}",
                vbmeta_note(&composed, self.config.vbmeta_override.is_some())
            ),
        );
        interrupt::check(self.interrupted)?;

        // Step 7: Publish
        write_stderr_line(
            stderr,
            format!("Publishing to {}...", self.config.out_dir),
        );
        let publication = ArtifactPublisher::new(&self.config.out_dir).publish(
            &self.config.device_dir,
            &composed.path,
            &self.inputs.device_images_name,
        )?;
        write_stderr_line(stderr, success_message(&publication.archive, &composed.sha256));

        Ok(RunSummary {
            archive: publication.archive,
            sha256: composed.sha256,
            verified,
            patched: self.config.patch.is_some(),
            spl_argument,
            vbmeta_replaced: composed.vbmeta_replaced,
        })
    }

    fn prepare_host_tools(&self, stderr: &mut dyn Write) -> Result<ToolEnv> {
        let Some(otatools) = &self.config.otatools else {
            return Ok(ToolEnv::default());
        };
        let root = self.scratch.host_tools();
        write_stderr_line(stderr, format!("Extracting host tools from {otatools}..."));
        self.extractor.extract(otatools, &Members::All, &root)?;
        Ok(ToolEnv::with_host_tools(&root))
    }

    fn extract_artifacts(&self, stderr: &mut dyn Write) -> Result<()> {
        write_stderr_line(stderr, "Extracting build artifacts...");
        let images = self.extractor.extract(
            &self.inputs.device_images,
            &Members::All,
            &self.scratch.device_images(),
        )?;
        let device_has_vbmeta = images.iter().any(|name| name == VBMETA_IMAGE_NAME);

        let members = system_members(device_has_vbmeta, self.config.vbmeta_override.is_some());
        self.extractor.extract(
            &self.inputs.system_target_files,
            &Members::only(members),
            &self.scratch.system_artifacts(),
        )?;
        self.extractor.extract(
            &self.inputs.device_target_files,
            &Members::only(DEVICE_MEMBERS.iter().copied()),
            &self.scratch.device_artifacts(),
        )?;
        Ok(())
    }

    fn verify(&self, env: &ToolEnv, stderr: &mut dyn Write) -> Result<bool> {
        let Some(checker) = &self.config.checker else {
            warn!("no compatibility checker available; skipping verification");
            write_stderr_line(stderr, "Compatibility verification skipped: no checker");
            return Ok(false);
        };
        write_stderr_line(stderr, "Verifying interface compatibility...");
        CompatibilityVerifier::new(self.executor, checker, env).verify_both(
            &self.scratch.system_artifacts(),
            &self.scratch.device_artifacts(),
        )?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
