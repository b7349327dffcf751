//! Deterministic archive creation.
//!
//! The composed image archive must be byte-identical across runs with the
//! same inputs, so entries are written in sorted order with a fixed
//! timestamp and only their permission bits carried over from disk.

use crate::error::{MixError, Result};
use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fs::{File, Metadata};
use std::io::{self, Read};
use std::path::{Component, Path};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns [`MixError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Zip the contents of `source_dir` recursively into `archive_path`.
///
/// Entry names are relative to `source_dir`. Symlinks are stored as the
/// files they point to. Returns the entry names in archive order.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked, a file cannot be read, or
/// the archive cannot be written.
pub fn create_archive_from_dir(
    source_dir: &Utf8Path,
    archive_path: &Utf8Path,
) -> Result<Vec<String>> {
    let output = File::create(archive_path)?;
    let mut writer = ZipWriter::new(output);
    let mut names = Vec::new();

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MixError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir.as_std_path())
            .map_err(io::Error::other)?;
        let name = entry_name(relative)?;
        let metadata = entry.metadata().map_err(|e| MixError::Io(e.into()))?;
        let options = entry_options(&metadata);

        if metadata.is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .map_err(|e| MixError::archive(archive_path, e))?;
        } else {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| MixError::archive(archive_path, e))?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
        }
        names.push(name);
    }

    writer
        .finish()
        .map_err(|e| MixError::archive(archive_path, e))?;
    Ok(names)
}

/// Build a `/`-separated archive entry name from a relative path.
fn entry_name(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| MixError::NonUtf8Path {
                    path: relative.display().to_string(),
                })?;
                parts.push(part);
            }
            _ => {
                return Err(MixError::NonUtf8Path {
                    path: relative.display().to_string(),
                });
            }
        }
    }
    Ok(parts.join("/"))
}

fn entry_options(metadata: &Metadata) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(permission_bits(metadata))
        .large_file(metadata.len() >= u64::from(u32::MAX))
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.is_dir() { 0o755 } else { 0o644 }
}
