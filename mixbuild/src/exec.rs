//! External tool invocation.
//!
//! Every external step (compatibility checker, patch script) runs through the
//! [`CommandExecutor`] trait so the pipeline can be exercised with scripted
//! responses. Tool search paths are carried explicitly in a [`ToolEnv`]
//! instead of being exported into the process environment.

use crate::error::{MixError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::ffi::OsString;
use std::process::{Command, Output};

/// Search paths prepended for external tool invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolEnv {
    bin_dirs: Vec<Utf8PathBuf>,
    lib_dirs: Vec<Utf8PathBuf>,
}

impl ToolEnv {
    /// Environment for a host tools tree extracted at `root`.
    ///
    /// `root/bin` is prepended to `PATH` and `root/lib64` to
    /// `LD_LIBRARY_PATH`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use mixbuild::exec::ToolEnv;
    ///
    /// let env = ToolEnv::with_host_tools(Utf8Path::new("/tmp/otatools"));
    /// assert_eq!(env.bin_dirs()[0], "/tmp/otatools/bin");
    /// assert_eq!(env.lib_dirs()[0], "/tmp/otatools/lib64");
    /// ```
    #[must_use]
    pub fn with_host_tools(root: &Utf8Path) -> Self {
        Self {
            bin_dirs: vec![root.join("bin")],
            lib_dirs: vec![root.join("lib64")],
        }
    }

    /// Directories prepended to `PATH`.
    #[must_use]
    pub fn bin_dirs(&self) -> &[Utf8PathBuf] {
        &self.bin_dirs
    }

    /// Directories prepended to `LD_LIBRARY_PATH`.
    #[must_use]
    pub fn lib_dirs(&self) -> &[Utf8PathBuf] {
        &self.lib_dirs
    }

    /// Return true when no search paths are added.
    #[must_use]
    pub fn is_inherited(&self) -> bool {
        self.bin_dirs.is_empty() && self.lib_dirs.is_empty()
    }

    /// Apply the search paths to a command about to be spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory contains the platform path separator.
    pub fn apply(&self, command: &mut Command) -> Result<()> {
        if let Some(path) = prepend_search_path(&self.bin_dirs, std::env::var_os("PATH"))? {
            command.env("PATH", path);
        }
        if let Some(path) =
            prepend_search_path(&self.lib_dirs, std::env::var_os("LD_LIBRARY_PATH"))?
        {
            command.env("LD_LIBRARY_PATH", path);
        }
        Ok(())
    }
}

/// Join `dirs` in front of an existing search path value.
///
/// Returns `None` when `dirs` is empty so the inherited value is left alone.
fn prepend_search_path(
    dirs: &[Utf8PathBuf],
    current: Option<OsString>,
) -> Result<Option<OsString>> {
    if dirs.is_empty() {
        return Ok(None);
    }
    let inherited = current
        .as_deref()
        .map(std::env::split_paths)
        .into_iter()
        .flatten()
        .filter(|entry| !entry.as_os_str().is_empty());
    let entries = dirs
        .iter()
        .map(|dir| dir.as_std_path().to_path_buf())
        .chain(inherited);
    std::env::join_paths(entries)
        .map(Some)
        .map_err(|e| MixError::Usage {
            reason: format!("invalid tool search path: {e}"),
        })
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns [`MixError::ToolSpawn`] if the command cannot be started.
    fn run(&self, cmd: &str, args: &[&str], env: &ToolEnv) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use mixbuild::exec::{CommandExecutor, SystemCommandExecutor, ToolEnv};
///
/// let executor = SystemCommandExecutor;
/// let output = executor.run("unzip", &["-v"], &ToolEnv::default())?;
/// assert!(output.status.success());
/// # Ok::<(), mixbuild::error::MixError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], env: &ToolEnv) -> Result<Output> {
        debug!("running {cmd} {}", args.join(" "));
        let mut command = Command::new(cmd);
        command.args(args);
        env.apply(&mut command)?;
        command.output().map_err(|source| MixError::ToolSpawn {
            tool: cmd.to_owned(),
            source,
        })
    }
}

/// Extract a readable failure message from a finished command.
///
/// Prefers trimmed stderr, falls back to stdout, then to the exit status.
#[must_use]
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return stdout.trim().to_owned();
    }
    format!("exited with {}", output.status)
}

/// Add execute permission to `path` if it has no execute bit at all.
///
/// A file with any execute bit set is left alone: a group-executable tool
/// owned by someone else runs fine but cannot be chmodded by the caller.
///
/// # Errors
///
/// Returns an I/O error if the permissions cannot be read or updated.
#[cfg(unix)]
pub fn ensure_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0 {
        return Ok(());
    }
    debug!("marking {path} executable");
    permissions.set_mode(mode | 0o111);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Add execute permission to `path` if it lacks it.
///
/// Non-Unix platforms have no execute bit, so this only checks existence.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be inspected.
#[cfg(not(unix))]
pub fn ensure_executable(path: &Utf8Path) -> Result<()> {
    std::fs::metadata(path)?;
    Ok(())
}
