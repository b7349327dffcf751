//! Zip archive handling for target-files and image archives.
//!
//! - [`extraction`] - Pulls named members out of an archive
//! - [`packaging`] - Writes deterministic archives and digests them

pub mod extraction;
pub mod packaging;

use std::path::{Component, Path};

/// Return true when an entry name stays inside the extraction directory.
///
/// Absolute names and names containing `..` are rejected.
#[must_use]
pub fn is_safe_entry_name(name: &str) -> bool {
    let path = Path::new(name);
    !path.has_root()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::parent_dir("../escape.img")]
    #[case::nested_parent("IMAGES/../../escape.img")]
    #[case::absolute("/etc/passwd")]
    fn rejects_escaping_names(#[case] name: &str) {
        assert!(!is_safe_entry_name(name), "expected {name} to be rejected");
    }

    #[rstest]
    #[case::image("IMAGES/system.img")]
    #[case::top_level("boot.img")]
    #[case::directory("META/")]
    fn accepts_normal_names(#[case] name: &str) {
        assert!(is_safe_entry_name(name));
    }
}
