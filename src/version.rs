//! Release version parsing and default key-prefix derivation
//!
//! Build artifacts are keyed under per-release prefixes in the bucket:
//! machine images under `buildimage-<major>.<minor>-`, installer ISOs under
//! `buildiso-<major>-`. Operators pass a version like "9.3" and the prefix
//! is derived unless overridden.

use std::fmt;
use std::str::FromStr;

/// A Rocky release version ("9.3" -> major 9, minor 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseVersion {
    pub major: u32,
    pub minor: u32,
}

/// Errors from parsing a release version string
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("Version must be in MAJOR.MINOR form, got: {0}")]
    MissingMinor(String),

    #[error("Version component is not a number: {0}")]
    NotANumber(String),
}

impl FromStr for ReleaseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| VersionError::MissingMinor(s.to_string()))?;

        let major: u32 = major
            .parse()
            .map_err(|_| VersionError::NotANumber(major.to_string()))?;
        let minor: u32 = minor
            .parse()
            .map_err(|_| VersionError::NotANumber(minor.to_string()))?;

        Ok(ReleaseVersion { major, minor })
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl ReleaseVersion {
    /// Default key prefix for machine-image artifacts of this release
    pub fn image_prefix(&self) -> String {
        format!("buildimage-{}.{}-", self.major, self.minor)
    }

    /// Default key prefix for installer ISO artifacts of this release.
    /// ISO build keys carry only the major version.
    pub fn iso_prefix(&self) -> String {
        format!("buildiso-{}-", self.major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_minor() {
        let v: ReleaseVersion = "9.3".parse().unwrap();
        assert_eq!(v.major, 9);
        assert_eq!(v.minor, 3);
    }

    #[test]
    fn derives_prefixes() {
        let v: ReleaseVersion = "9.3".parse().unwrap();
        assert_eq!(v.image_prefix(), "buildimage-9.3-");
        assert_eq!(v.iso_prefix(), "buildiso-9-");
    }

    #[test]
    fn rejects_bare_major() {
        let err = "9".parse::<ReleaseVersion>().unwrap_err();
        assert!(matches!(err, VersionError::MissingMinor(_)));
    }

    #[test]
    fn rejects_non_numeric() {
        let err = "9.x".parse::<ReleaseVersion>().unwrap_err();
        assert!(matches!(err, VersionError::NotANumber(_)));
    }
}
