//! Artifact lookup inside build directories.
//!
//! Build directories hold archives whose names embed product and build
//! identifiers, so they are located by shell-style pattern instead of by
//! exact name. Exactly one regular file may match.

use crate::error::{MixError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use log::debug;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Find the single file under `dir` whose file name matches `pattern`.
///
/// The search is recursive and symlinks are followed, so build directories
/// that link into shared artifact storage are handled like plain trees. The
/// `excluded` directory, typically an output directory nested inside `dir`,
/// is not descended into.
///
/// # Errors
///
/// Returns [`MixError::ArtifactNotFound`] when nothing matches and
/// [`MixError::AmbiguousArtifact`] when more than one file matches.
pub fn find_unique_artifact(
    dir: &Utf8Path,
    pattern: &'static str,
    excluded: Option<&Utf8Path>,
) -> Result<Utf8PathBuf> {
    let mut matches = find_artifacts(dir, pattern, excluded)?;
    match matches.len() {
        0 => Err(MixError::ArtifactNotFound {
            dir: dir.to_owned(),
            pattern,
        }),
        1 => {
            let found = matches.remove(0);
            debug!("located {pattern} at {found}");
            Ok(found)
        }
        _ => Err(MixError::AmbiguousArtifact {
            dir: dir.to_owned(),
            pattern,
            matches,
        }),
    }
}

/// Return every regular file under `dir` matching `pattern`, sorted.
///
/// A missing directory yields an empty list. An `excluded` directory that
/// does not exist yet excludes nothing.
///
/// # Errors
///
/// Returns an error if the pattern is malformed, the tree cannot be walked,
/// or a matching path is not valid UTF-8.
pub fn find_artifacts(
    dir: &Utf8Path,
    pattern: &str,
    excluded: Option<&Utf8Path>,
) -> Result<Vec<Utf8PathBuf>> {
    let matcher = Pattern::new(pattern).map_err(|e| MixError::Usage {
        reason: format!("invalid artifact pattern {pattern}: {e}"),
    })?;

    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let skip = excluded.and_then(|path| path.canonicalize().ok());
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, skip.as_deref()));
    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| MixError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !matcher.matches(&name) {
            continue;
        }
        let path = Utf8PathBuf::try_from(entry.into_path()).map_err(|e| MixError::NonUtf8Path {
            path: e.into_path_buf().display().to_string(),
        })?;
        found.push(path);
    }
    found.sort();
    Ok(found)
}

fn is_excluded_dir(entry: &DirEntry, excluded: Option<&Path>) -> bool {
    match excluded {
        Some(excluded) if entry.depth() > 0 && entry.file_type().is_dir() => entry
            .path()
            .canonicalize()
            .is_ok_and(|path| path == excluded),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{IMG_ARCHIVE_GLOB, TARGET_FILES_GLOB};
    use std::fs;

    fn build_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, path)
    }

    #[test]
    fn finds_single_match_at_top_level() {
        let (_temp, dir) = build_dir();
        fs::write(dir.join("aosp_arm64-target_files-1234.zip"), b"zip").expect("write");
        fs::write(dir.join("aosp_arm64-img-1234.zip"), b"zip").expect("write");

        let found = find_unique_artifact(&dir, TARGET_FILES_GLOB, None).expect("locate");
        assert_eq!(found, dir.join("aosp_arm64-target_files-1234.zip"));
    }

    #[test]
    fn search_is_recursive() {
        let (_temp, dir) = build_dir();
        let nested = dir.join("dist").join("images");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(nested.join("device-img-77.zip"), b"zip").expect("write");

        let found = find_unique_artifact(&dir, IMG_ARCHIVE_GLOB, None).expect("locate");
        assert_eq!(found, nested.join("device-img-77.zip"));
    }

    #[test]
    fn missing_artifact_names_dir_and_pattern() {
        let (_temp, dir) = build_dir();
        fs::write(dir.join("README.txt"), b"notes").expect("write");

        let err = find_unique_artifact(&dir, TARGET_FILES_GLOB, None).expect_err("not found");
        assert!(matches!(
            err,
            MixError::ArtifactNotFound { pattern, .. } if pattern == TARGET_FILES_GLOB
        ));
        assert!(err.to_string().contains(dir.as_str()));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let (_temp, dir) = build_dir();
        let err = find_unique_artifact(&dir.join("absent"), TARGET_FILES_GLOB, None)
            .expect_err("not found");
        assert!(matches!(err, MixError::ArtifactNotFound { .. }));
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let (_temp, dir) = build_dir();
        fs::create_dir_all(dir.join("old")).expect("mkdir");
        fs::write(dir.join("a-target_files-1.zip"), b"zip").expect("write");
        fs::write(dir.join("old").join("a-target_files-0.zip"), b"zip").expect("write");

        let err = find_unique_artifact(&dir, TARGET_FILES_GLOB, None).expect_err("ambiguous");
        match err {
            MixError::AmbiguousArtifact { matches, .. } => {
                assert_eq!(
                    matches,
                    vec![
                        dir.join("a-target_files-1.zip"),
                        dir.join("old").join("a-target_files-0.zip"),
                    ]
                );
            }
            other => panic!("expected AmbiguousArtifact, got {other:?}"),
        }
    }

    #[test]
    fn excluded_output_directory_is_not_searched() {
        let (_temp, dir) = build_dir();
        let out_dir = dir.join("dist");
        fs::create_dir_all(&out_dir).expect("mkdir");
        fs::write(dir.join("cf-target_files-eng.zip"), b"zip").expect("write");
        fs::write(out_dir.join("cf-target_files-eng.zip"), b"zip").expect("write");

        let found = find_unique_artifact(&dir, TARGET_FILES_GLOB, Some(out_dir.as_path()))
            .expect("locate");
        assert_eq!(found, dir.join("cf-target_files-eng.zip"));

        let err = find_unique_artifact(&dir, TARGET_FILES_GLOB, None).expect_err("ambiguous");
        assert!(matches!(err, MixError::AmbiguousArtifact { .. }));
    }

    #[test]
    fn missing_excluded_directory_leaves_search_unchanged() {
        let (_temp, dir) = build_dir();
        fs::write(dir.join("device-img-1.zip"), b"zip").expect("write");

        let out_dir = dir.join("dist");
        let found = find_unique_artifact(&dir, IMG_ARCHIVE_GLOB, Some(out_dir.as_path()))
            .expect("locate");
        assert_eq!(found, dir.join("device-img-1.zip"));
    }

    #[test]
    fn directories_matching_the_pattern_are_ignored() {
        let (_temp, dir) = build_dir();
        fs::create_dir_all(dir.join("unpacked-img-1.zip")).expect("mkdir");
        fs::write(dir.join("device-img-1.zip"), b"zip").expect("write");

        let found = find_unique_artifact(&dir, IMG_ARCHIVE_GLOB, None).expect("locate");
        assert_eq!(found, dir.join("device-img-1.zip"));
    }
}
