//! Fixed names consumed from build directories and target-files archives.

/// Naming pattern of a target-files archive inside a build directory.
pub const TARGET_FILES_GLOB: &str = "*-target_files-*.zip";

/// Naming pattern of the device image archive inside the device build directory.
pub const IMG_ARCHIVE_GLOB: &str = "*-img-*.zip";

/// System partition image inside a target-files archive.
pub const SYSTEM_IMAGE: &str = "IMAGES/system.img";

/// Verified-boot metadata image inside a target-files archive.
pub const VBMETA_IMAGE: &str = "IMAGES/vbmeta.img";

/// Compatibility matrix published by the system side.
pub const SYSTEM_MATRIX: &str = "META/system_matrix.xml";

/// Interface manifest published by the system side.
pub const SYSTEM_MANIFEST: &str = "META/system_manifest.xml";

/// Compatibility matrix published by the vendor side.
pub const VENDOR_MATRIX: &str = "META/vendor_matrix.xml";

/// Interface manifest published by the vendor side.
pub const VENDOR_MANIFEST: &str = "META/vendor_manifest.xml";

/// Build property file inside a target-files archive.
pub const BUILD_PROP: &str = "SYSTEM/build.prop";

/// Property holding the security patch level.
pub const SECURITY_PATCH_PROPERTY: &str = "ro.build.version.security_patch";

/// File name of `system.img` within the extracted device image set.
pub const SYSTEM_IMAGE_NAME: &str = "system.img";

/// File name of `vbmeta.img` within the extracted device image set.
pub const VBMETA_IMAGE_NAME: &str = "vbmeta.img";

/// Directory names skipped when publishing the device build directory.
pub const PUBLISH_EXCLUDES: &[&str] = &["logs"];

/// Members extracted from the device target-files archive.
pub const DEVICE_MEMBERS: &[&str] = &[VENDOR_MATRIX, VENDOR_MANIFEST, BUILD_PROP];

/// Members extracted from the system target-files archive.
///
/// `vbmeta.img` is only requested when the device image set carries one and
/// no override image was configured, so a system build without vbmeta can
/// still be mixed with a device that has none.
#[must_use]
pub fn system_members(device_has_vbmeta: bool, has_vbmeta_override: bool) -> Vec<&'static str> {
    let mut members = vec![SYSTEM_IMAGE, SYSTEM_MATRIX, SYSTEM_MANIFEST, BUILD_PROP];
    if device_has_vbmeta && !has_vbmeta_override {
        members.push(VBMETA_IMAGE);
    }
    members
}
