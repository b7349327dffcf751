//! Error types for the mixed-build pipeline.
//!
//! Every failure is fatal for the current invocation. The variants are
//! grouped by the kind of fault so the CLI can report the failing input or
//! tool by name.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while assembling a mixed build.
#[derive(Debug, Error)]
pub enum MixError {
    /// The command line or configuration is unusable.
    #[error("invalid usage: {reason}")]
    Usage {
        /// Description of the problem.
        reason: String,
    },

    /// One option of a paired option set was supplied without its partner.
    #[error("option {present} requires option {missing}; they must be supplied together")]
    UnpairedOption {
        /// The flag that was supplied.
        present: &'static str,
        /// The flag that is missing.
        missing: &'static str,
    },

    /// No file under the build directory matches the expected pattern.
    #[error("no artifact matching {pattern} found in {dir}")]
    ArtifactNotFound {
        /// Directory that was searched.
        dir: Utf8PathBuf,
        /// Shell-style pattern the artifact must match.
        pattern: &'static str,
    },

    /// More than one file under the build directory matches the pattern.
    #[error("ambiguous artifact: {count} files matching {pattern} found in {dir}: {listing}", count = .matches.len(), listing = join_paths(.matches))]
    AmbiguousArtifact {
        /// Directory that was searched.
        dir: Utf8PathBuf,
        /// Shell-style pattern the artifact must match.
        pattern: &'static str,
        /// Every matching path, sorted.
        matches: Vec<Utf8PathBuf>,
    },

    /// A path supplied explicitly on the command line does not exist.
    #[error("{what} not found at {path}")]
    MissingInput {
        /// Human-readable name of the input.
        what: &'static str,
        /// The path that was supplied.
        path: Utf8PathBuf,
    },

    /// A requested member is absent from an archive.
    #[error("{member} not found in archive {archive}")]
    MissingMember {
        /// Archive that was opened.
        archive: Utf8PathBuf,
        /// Internal path that was requested.
        member: String,
    },

    /// An archive could not be opened, read or written.
    #[error("archive error in {path}: {source}")]
    Archive {
        /// Archive being processed.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An archive entry would be written outside the destination directory.
    #[error("unsafe entry {entry} in archive {archive}")]
    UnsafeEntry {
        /// Archive that contains the entry.
        archive: Utf8PathBuf,
        /// The offending entry name.
        entry: String,
    },

    /// The compatibility checker rejected a manifest/matrix pair.
    #[error("compatibility check failed for {manifest} against {matrix}: {message}")]
    Incompatible {
        /// Manifest that was checked.
        manifest: Utf8PathBuf,
        /// Matrix it was checked against.
        matrix: Utf8PathBuf,
        /// Output reported by the checker.
        message: String,
    },

    /// The system image patch procedure exited unsuccessfully.
    #[error("system image patch script {script} failed: {message}")]
    PatchFailed {
        /// The patch script that was invoked.
        script: Utf8PathBuf,
        /// Output reported by the script.
        message: String,
    },

    /// An external tool could not be started.
    #[error("failed to run {tool}: {source}")]
    ToolSpawn {
        /// The tool that failed to start.
        tool: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// The output directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// The run was interrupted by a signal.
    #[error("interrupted")]
    Interrupted,

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl MixError {
    /// Wrap a zip error with the archive it came from.
    pub fn archive(path: impl Into<Utf8PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// Return true for configuration and command-line errors.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. } | Self::UnpairedOption { .. })
    }
}

fn join_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using [`MixError`].
pub type Result<T> = std::result::Result<T, MixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpaired_option_names_both_flags() {
        let err = MixError::UnpairedOption {
            present: "-v",
            missing: "-m",
        };
        let msg = err.to_string();
        assert!(msg.contains("-v"));
        assert!(msg.contains("-m"));
        assert!(err.is_usage());
    }

    #[test]
    fn artifact_not_found_names_dir_and_pattern() {
        let err = MixError::ArtifactNotFound {
            dir: Utf8PathBuf::from("/builds/system"),
            pattern: "*-target_files-*.zip",
        };
        let msg = err.to_string();
        assert!(msg.contains("/builds/system"));
        assert!(msg.contains("*-target_files-*.zip"));
        assert!(!err.is_usage());
    }

    #[test]
    fn ambiguous_artifact_lists_every_match() {
        let err = MixError::AmbiguousArtifact {
            dir: Utf8PathBuf::from("/builds/device"),
            pattern: "*-img-*.zip",
            matches: vec![
                Utf8PathBuf::from("/builds/device/a-img-1.zip"),
                Utf8PathBuf::from("/builds/device/b-img-2.zip"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 files"));
        assert!(msg.contains("a-img-1.zip, /builds/device/b-img-2.zip"));
    }

    #[test]
    fn incompatible_includes_checker_output() {
        let err = MixError::Incompatible {
            manifest: Utf8PathBuf::from("vendor_manifest.xml"),
            matrix: Utf8PathBuf::from("system_matrix.xml"),
            message: "hal android.hardware.foo@1.0 missing".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("vendor_manifest.xml"));
        assert!(msg.contains("system_matrix.xml"));
        assert!(msg.contains("android.hardware.foo@1.0"));
    }

    #[test]
    fn tool_spawn_preserves_source() {
        let err = MixError::ToolSpawn {
            tool: "check_vintf".to_owned(),
            source: std::io::Error::other("no such file"),
        };
        assert!(err.to_string().contains("check_vintf"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
