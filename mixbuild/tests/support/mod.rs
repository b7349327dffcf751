//! Test support for mixbuild behavioural tests.
//!
//! Builds realistic system and device build directories out of small zip
//! archives so scenarios can drive the whole pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{Read, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// File name of the device image archive in every fixture.
pub const IMG_ARCHIVE: &str = "aosp_cf_x86_64-img-eng.zip";

/// Security patch level of the fixture system build.
pub const SYSTEM_SPL: &str = "2023-01-01";

/// Writes a zip archive containing `entries`.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
    }
    writer.finish().expect("finish zip");
}

/// Reads one member of a zip archive, returning `None` when it is absent.
pub fn read_member(archive: &Utf8Path, name: &str) -> Option<Vec<u8>> {
    let file = File::open(archive).expect("open archive");
    let mut zip = zip::ZipArchive::new(file).expect("read archive");
    let mut entry = zip.by_name(name).ok()?;
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).expect("read member");
    Some(contents)
}

/// Returns the first existing path among `candidates`.
pub fn first_existing(candidates: &[&str]) -> Option<Utf8PathBuf> {
    candidates
        .iter()
        .map(Utf8PathBuf::from)
        .find(|path| path.is_file())
}

/// A system build and a device build side by side in a temporary directory.
pub struct BuildFixture {
    _temp: TempDir,
    /// Root of the temporary tree.
    pub root: Utf8PathBuf,
    /// System build directory.
    pub system_dir: Utf8PathBuf,
    /// Device build directory.
    pub device_dir: Utf8PathBuf,
    /// Distribution directory; not created by the fixture.
    pub out_dir: Utf8PathBuf,
    /// Parent directory for scratch workspaces.
    pub scratch_parent: Utf8PathBuf,
}

impl BuildFixture {
    /// Creates both build directories.
    ///
    /// The device build declares `device_spl` and carries `vbmeta.img` in its
    /// image archive when `device_has_vbmeta` is set.
    pub fn new(device_spl: &str, device_has_vbmeta: bool) -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
        let system_dir = root.join("system");
        let device_dir = root.join("device");
        let scratch_parent = root.join("scratch");
        for dir in [&system_dir, &device_dir, &scratch_parent] {
            fs::create_dir_all(dir).expect("create directory");
        }

        let system_prop = build_prop(SYSTEM_SPL);
        write_zip(
            &system_dir.join("aosp_arm64-target_files-eng.zip"),
            &[
                ("IMAGES/system.img", b"generic system".as_slice()),
                ("IMAGES/vbmeta.img", b"system vbmeta".as_slice()),
                ("META/system_matrix.xml", b"<compatibility-matrix/>".as_slice()),
                ("META/system_manifest.xml", b"<manifest/>".as_slice()),
                ("SYSTEM/build.prop", system_prop.as_slice()),
            ],
        );

        let device_prop = build_prop(device_spl);
        write_zip(
            &device_dir.join("aosp_cf_x86_64-target_files-eng.zip"),
            &[
                ("META/vendor_matrix.xml", b"<compatibility-matrix/>".as_slice()),
                ("META/vendor_manifest.xml", b"<manifest/>".as_slice()),
                ("SYSTEM/build.prop", device_prop.as_slice()),
            ],
        );

        let mut images = vec![
            ("boot.img", b"device boot".as_slice()),
            ("system.img", b"device system".as_slice()),
        ];
        if device_has_vbmeta {
            images.push(("vbmeta.img", b"device vbmeta".as_slice()));
        }
        write_zip(&device_dir.join(IMG_ARCHIVE), &images);
        fs::create_dir_all(device_dir.join("logs")).expect("create logs");
        fs::write(device_dir.join("logs/build.log"), b"log").expect("write log");

        Self {
            out_dir: root.join("dist"),
            _temp: temp,
            root,
            system_dir,
            device_dir,
            scratch_parent,
        }
    }

    /// Writes a file under the fixture root and returns its path.
    pub fn file(&self, name: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Returns true when no scratch workspace remains.
    pub fn scratch_is_empty(&self) -> bool {
        fs::read_dir(&self.scratch_parent)
            .expect("read scratch parent")
            .next()
            .is_none()
    }

    /// Reads a member of the published image archive.
    pub fn published(&self, name: &str) -> Option<Vec<u8>> {
        read_member(&self.out_dir.join(IMG_ARCHIVE), name)
    }
}

fn build_prop(spl: &str) -> Vec<u8> {
    format!("ro.build.id=TEST\nro.build.version.security_patch={spl}\n").into_bytes()
}
