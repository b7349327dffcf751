//! CLI argument definitions for mixbuild.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::Parser;

/// Assemble a mixed build from a system build and a device build.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mixbuild")]
#[command(version, about)]
#[command(long_about = concat!(
    "Assemble a mixed build from a system build and a device build.\n\n",
    "The system image of SYSTEM_BUILD_DIR is combined with the device images of ",
    "DEVICE_BUILD_DIR after checking interface compatibility in both directions. ",
    "The device build directory is copied to OUT_DIR with its image archive ",
    "replaced by the mixed image archive.",
))]
#[command(after_help = concat!(
    "INPUTS:\n",
    "  SYSTEM_BUILD_DIR must contain one *-target_files-*.zip.\n",
    "  DEVICE_BUILD_DIR must contain one *-target_files-*.zip and one *-img-*.zip.\n\n",
    "EXAMPLES:\n",
    "  Mix and verify with check_vintf:\n",
    "    $ mixbuild out/system out/device out/mixed ./check_vintf\n\n",
    "  Patch the system image for a legacy vendor:\n",
    "    $ mixbuild -v 28 -m ./modify_system.sh out/system out/device out/mixed\n\n",
    "  Use host tools from an otatools archive and override vbmeta:\n",
    "    $ mixbuild -t otatools.zip -p vbmeta_disabled.img out/system out/device out/mixed",
))]
pub struct Cli {
    /// Vendor version for the legacy ABI patch (requires -m).
    #[arg(short = 'v', value_name = "VENDOR_VERSION")]
    pub vendor_version: Option<String>,

    /// Script that patches the system target files (requires -v).
    #[arg(short = 'm', value_name = "MODIFY_SYSTEM_SCRIPT")]
    pub modify_system_script: Option<Utf8PathBuf>,

    /// Image used instead of the system build's vbmeta.img.
    #[arg(short = 'p', value_name = "OVERRIDE_VBMETA_IMAGE")]
    pub override_vbmeta_image: Option<Utf8PathBuf>,

    /// Archive of host tools put on the tool search path.
    #[arg(short = 't', value_name = "OTATOOLS_ZIP")]
    pub otatools_zip: Option<Utf8PathBuf>,

    /// Build directory holding the system target-files archive.
    #[arg(value_name = "SYSTEM_BUILD_DIR")]
    pub system_build_dir: Utf8PathBuf,

    /// Build directory holding the device target-files and image archives.
    #[arg(value_name = "DEVICE_BUILD_DIR")]
    pub device_build_dir: Utf8PathBuf,

    /// Distribution directory receiving the mixed build.
    #[arg(value_name = "OUT_DIR")]
    pub out_dir: Utf8PathBuf,

    /// Compatibility checker; verification is skipped when absent.
    #[arg(value_name = "CHECK_TOOL")]
    pub check_tool: Option<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
