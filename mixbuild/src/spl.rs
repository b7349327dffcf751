//! Security patch level comparison between the system and device builds.

use crate::error::{MixError, Result};
use crate::layout::SECURITY_PATCH_PROPERTY;
use camino::Utf8Path;
use std::fs;
use std::io;

/// Read the value of `key` from a `key=value` property file.
///
/// The first line starting with `key=` wins and the rest of the line is the
/// value. A missing key yields an empty string.
///
/// # Errors
///
/// Returns [`MixError::MissingInput`] if the file does not exist and
/// [`MixError::Io`] if it cannot be read.
pub fn read_property(path: &Utf8Path, key: &str) -> Result<String> {
    let contents = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MixError::MissingInput {
            what: "build property file",
            path: path.to_owned(),
        },
        _ => MixError::Io(e),
    })?;
    Ok(property_value(&String::from_utf8_lossy(&contents), key))
}

/// Find the value of `key` in property file contents.
///
/// # Examples
///
/// ```
/// use mixbuild::spl::property_value;
///
/// let props = "ro.build.id=AP1A\nro.build.version.security_patch=2024-03-05\n";
/// assert_eq!(
///     property_value(props, "ro.build.version.security_patch"),
///     "2024-03-05"
/// );
/// assert_eq!(property_value(props, "ro.missing"), "");
/// ```
#[must_use]
pub fn property_value(contents: &str, key: &str) -> String {
    contents
        .lines()
        .find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|value| value.trim_end_matches('\r').to_owned())
        .unwrap_or_default()
}

/// Security patch levels read from both sides of a mixed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLevels {
    /// Level declared by the system build.
    pub system: String,
    /// Level declared by the device (vendor) build.
    pub device: String,
}

impl PatchLevels {
    /// Read both patch levels from extracted property files.
    ///
    /// # Errors
    ///
    /// Returns an error if either property file cannot be read.
    pub fn read(system_prop: &Utf8Path, device_prop: &Utf8Path) -> Result<Self> {
        Ok(Self {
            system: read_property(system_prop, SECURITY_PATCH_PROPERTY)?,
            device: read_property(device_prop, SECURITY_PATCH_PROPERTY)?,
        })
    }

    /// Return true when the two sides declare different levels.
    ///
    /// An absent value is an empty string and compares like any other value.
    #[must_use]
    pub fn differ(&self) -> bool {
        self.system != self.device
    }

    /// The extra patcher argument required by a mismatch, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixbuild::spl::PatchLevels;
    ///
    /// let levels = PatchLevels {
    ///     system: "2023-01-01".to_owned(),
    ///     device: "2023-02-01".to_owned(),
    /// };
    /// assert_eq!(levels.mismatch_argument(), Some("2023-02-01"));
    /// ```
    #[must_use]
    pub fn mismatch_argument(&self) -> Option<&str> {
        self.differ().then_some(self.device.as_str())
    }
}
