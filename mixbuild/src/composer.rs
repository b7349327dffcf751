//! Composition of the mixed device image archive.

use crate::archive::packaging::{compute_sha256, create_archive_from_dir};
use crate::error::Result;
use crate::layout::{SYSTEM_IMAGE_NAME, VBMETA_IMAGE_NAME};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;

/// Where a replacement `vbmeta.img` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VbmetaSource<'a> {
    /// Image supplied explicitly on the command line.
    Override(&'a Utf8Path),
    /// `IMAGES/vbmeta.img` extracted from the system build.
    System(&'a Utf8Path),
}

impl<'a> VbmetaSource<'a> {
    /// Prefer `override_image` over the system build's image.
    #[must_use]
    pub fn select(override_image: Option<&'a Utf8Path>, system_image: &'a Utf8Path) -> Self {
        override_image.map_or(Self::System(system_image), Self::Override)
    }

    /// Path of the replacement image.
    #[must_use]
    pub fn path(&self) -> &'a Utf8Path {
        match self {
            Self::Override(path) | Self::System(path) => *path,
        }
    }
}

/// The composed image archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedArchive {
    /// Location of the archive in the scratch workspace.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 digest of the archive.
    pub sha256: String,
    /// Whether the device image set carried a `vbmeta.img` that was replaced.
    pub vbmeta_replaced: bool,
}

/// Overlays system images onto an extracted device image set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageComposer;

impl ImageComposer {
    /// Overwrite images in `device_images` and zip the directory into `dest`.
    ///
    /// `system.img` is always replaced. `vbmeta.img` is replaced from
    /// `vbmeta` only when the device image set already contains one, so a
    /// device without verified-boot metadata never gains it.
    ///
    /// # Errors
    ///
    /// Returns an error if an image cannot be copied or the archive cannot be
    /// written.
    pub fn compose(
        &self,
        device_images: &Utf8Path,
        system_image: &Utf8Path,
        vbmeta: VbmetaSource<'_>,
        dest: &Utf8Path,
    ) -> Result<ComposedArchive> {
        let system_target = device_images.join(SYSTEM_IMAGE_NAME);
        debug!("copying {system_image} to {system_target}");
        fs::copy(system_image, &system_target)?;

        let vbmeta_target = device_images.join(VBMETA_IMAGE_NAME);
        let vbmeta_replaced = vbmeta_target.is_file();
        if vbmeta_replaced {
            debug!("copying {} to {vbmeta_target}", vbmeta.path());
            fs::copy(vbmeta.path(), &vbmeta_target)?;
        }

        let entries = create_archive_from_dir(device_images, dest)?;
        let sha256 = compute_sha256(dest)?;
        info!(
            "composed {dest} with {} entries (sha256 {sha256})",
            entries.len()
        );
        Ok(ComposedArchive {
            path: dest.to_owned(),
            sha256,
            vbmeta_replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extraction::{ArchiveExtractor, Members, ZipExtractor};
    use rstest::rstest;

    struct Fixture {
        _temp: tempfile::TempDir,
        root: Utf8PathBuf,
        device_images: Utf8PathBuf,
        system_image: Utf8PathBuf,
        system_vbmeta: Utf8PathBuf,
        override_vbmeta: Utf8PathBuf,
    }

    fn fixture(device_has_vbmeta: bool) -> Fixture {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let device_images = root.join("device_images");
        fs::create_dir_all(&device_images).expect("mkdir");
        fs::write(device_images.join("system.img"), b"device system").expect("write");
        fs::write(device_images.join("boot.img"), b"device boot").expect("write");
        if device_has_vbmeta {
            fs::write(device_images.join("vbmeta.img"), b"device vbmeta").expect("write");
        }
        let system_image = root.join("system.img");
        fs::write(&system_image, b"generic system").expect("write");
        let system_vbmeta = root.join("system_vbmeta.img");
        fs::write(&system_vbmeta, b"system vbmeta").expect("write");
        let override_vbmeta = root.join("override_vbmeta.img");
        fs::write(&override_vbmeta, b"override vbmeta").expect("write");
        Fixture {
            _temp: temp,
            root,
            device_images,
            system_image,
            system_vbmeta,
            override_vbmeta,
        }
    }

    fn unpack(fx: &Fixture, archive: &Utf8Path) -> Utf8PathBuf {
        let dest = fx.root.join("unpacked");
        ZipExtractor
            .extract(archive, &Members::All, &dest)
            .expect("extract");
        dest
    }

    #[rstest]
    #[case::system_vbmeta(false, b"system vbmeta".as_slice())]
    #[case::override_vbmeta(true, b"override vbmeta".as_slice())]
    fn vbmeta_is_replaced_when_present(#[case] use_override: bool, #[case] expected: &[u8]) {
        let fx = fixture(true);
        let dest = fx.root.join("mixed.zip");
        let vbmeta = VbmetaSource::select(
            use_override.then_some(fx.override_vbmeta.as_path()),
            &fx.system_vbmeta,
        );

        let composed = ImageComposer
            .compose(&fx.device_images, &fx.system_image, vbmeta, &dest)
            .expect("compose");

        assert!(composed.vbmeta_replaced);
        let unpacked = unpack(&fx, &composed.path);
        assert_eq!(fs::read(unpacked.join("vbmeta.img")).expect("read"), expected);
        assert_eq!(
            fs::read(unpacked.join("system.img")).expect("read"),
            b"generic system"
        );
        assert_eq!(
            fs::read(unpacked.join("boot.img")).expect("read"),
            b"device boot"
        );
    }

    #[rstest]
    #[case::without_override(false)]
    #[case::with_override(true)]
    fn vbmeta_is_never_added(#[case] use_override: bool) {
        let fx = fixture(false);
        let dest = fx.root.join("mixed.zip");
        let vbmeta = VbmetaSource::select(
            use_override.then_some(fx.override_vbmeta.as_path()),
            &fx.system_vbmeta,
        );

        let composed = ImageComposer
            .compose(&fx.device_images, &fx.system_image, vbmeta, &dest)
            .expect("compose");

        assert!(!composed.vbmeta_replaced);
        let unpacked = unpack(&fx, &composed.path);
        assert!(!unpacked.join("vbmeta.img").exists());
        assert!(!fx.device_images.join("vbmeta.img").exists());
    }

    #[test]
    fn digest_matches_written_archive() {
        let fx = fixture(true);
        let dest = fx.root.join("mixed.zip");

        let composed = ImageComposer
            .compose(
                &fx.device_images,
                &fx.system_image,
                VbmetaSource::System(&fx.system_vbmeta),
                &dest,
            )
            .expect("compose");

        assert_eq!(composed.sha256, compute_sha256(&dest).expect("digest"));
        assert_eq!(composed.sha256.len(), 64);
    }

    #[test]
    fn missing_system_image_fails() {
        let fx = fixture(false);
        let dest = fx.root.join("mixed.zip");

        let result = ImageComposer.compose(
            &fx.device_images,
            &fx.root.join("absent.img"),
            VbmetaSource::System(&fx.system_vbmeta),
            &dest,
        );

        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
