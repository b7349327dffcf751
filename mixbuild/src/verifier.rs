//! Bidirectional interface compatibility verification.
//!
//! The checker is an external tool invoked as `<checker> <manifest> <matrix>`.
//! A zero exit status means the manifest satisfies the matrix. The vendor
//! manifest is checked against the system matrix first, then the system
//! manifest against the vendor matrix.

use crate::error::{MixError, Result};
use crate::exec::{CommandExecutor, ToolEnv, ensure_executable, failure_message};
use crate::layout::{SYSTEM_MANIFEST, SYSTEM_MATRIX, VENDOR_MANIFEST, VENDOR_MATRIX};
use camino::Utf8Path;
use log::{debug, info};

/// Runs the compatibility checker over manifest/matrix pairs.
pub struct CompatibilityVerifier<'a> {
    executor: &'a dyn CommandExecutor,
    checker: &'a Utf8Path,
    env: &'a ToolEnv,
}

impl<'a> CompatibilityVerifier<'a> {
    /// Create a verifier that invokes `checker` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, checker: &'a Utf8Path, env: &'a ToolEnv) -> Self {
        Self {
            executor,
            checker,
            env,
        }
    }

    /// Check that `manifest` satisfies `matrix`.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::Incompatible`] when the checker exits unsuccessfully
    /// and [`MixError::ToolSpawn`] when it cannot be started.
    pub fn check(&self, manifest: &Utf8Path, matrix: &Utf8Path) -> Result<()> {
        debug!("checking {manifest} against {matrix}");
        let output = self.executor.run(
            self.checker.as_str(),
            &[manifest.as_str(), matrix.as_str()],
            self.env,
        )?;
        if output.status.success() {
            return Ok(());
        }
        Err(MixError::Incompatible {
            manifest: manifest.to_owned(),
            matrix: matrix.to_owned(),
            message: failure_message(&output),
        })
    }

    /// Check both directions between extracted system and device metadata.
    ///
    /// The checker is made executable first if it is not already.
    ///
    /// # Errors
    ///
    /// Returns the first failing check; the second direction is not run when
    /// the first fails.
    pub fn verify_both(&self, system_artifacts: &Utf8Path, device_artifacts: &Utf8Path) -> Result<()> {
        ensure_executable(self.checker)?;
        self.check(
            &device_artifacts.join(VENDOR_MANIFEST),
            &system_artifacts.join(SYSTEM_MATRIX),
        )?;
        self.check(
            &system_artifacts.join(SYSTEM_MANIFEST),
            &device_artifacts.join(VENDOR_MATRIX),
        )?;
        info!("system and device interfaces are compatible");
        Ok(())
    }
}
