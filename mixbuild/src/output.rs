//! Output formatting for the mixbuild CLI.
//!
//! Progress and the final summary are written to stderr; stdout stays
//! unused so the tool composes with other build scripts.

use crate::composer::ComposedArchive;
use camino::Utf8Path;
use std::io::Write;

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Format the message printed after a successful run.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use mixbuild::output::success_message;
///
/// let message = success_message(Utf8Path::new("/dist/cf-img-eng.zip"), "ab12");
/// assert_eq!(message, "Mixed build written to /dist/cf-img-eng.zip (sha256 ab12)");
/// ```
#[must_use]
pub fn success_message(archive: &Utf8Path, sha256: &str) -> String {
    format!("Mixed build written to {archive} (sha256 {sha256})")
}

/// Describe how the composed archive treated `vbmeta.img`.
#[must_use]
pub fn vbmeta_note(composed: &ComposedArchive, overridden: bool) -> &'static str {
    match (composed.vbmeta_replaced, overridden) {
        (false, _) => "device image set has no vbmeta.img; left unchanged",
        (true, true) => "vbmeta.img replaced with the override image",
        (true, false) => "vbmeta.img replaced with the system build's image",
    }
}
