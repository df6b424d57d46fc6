//! Key parser: fixed key patterns and field extraction
//!
//! Each pipeline owns exactly one pattern, applied to every key from the
//! listing. A key that does not match is not an error; most keys in the
//! bucket belong to other content and are simply skipped. A key that DOES
//! match but whose datestamp segment cannot be read as epoch seconds is a
//! fatal condition for the whole run: it means the bucket layout drifted,
//! and a stale "latest" answer is worse than a loud failure.

use chrono::{TimeZone, Utc};
use regex_lite::Regex;

use super::{DiscImage, MachineImage};

/// Machine-image key shape:
/// `Rocky-<major>-<type>[-<variant>]-<ver>.<minor>-<date>.<epoch>.<arch>/<datestamp>/<file>.<ext>`
const MACHINE_IMAGE_KEY: &str = r"Rocky-(?P<major>[0-9]+)-(?P<type>\w+)(?:-(?P<variant>\w+))?-[0-9]+\.(?P<minor>[0-9])-(?P<date>[0-9]+)\.(?P<epoch>[0-9]+)\.(?P<architecture>\w+)/(?P<datestamp>[0-9]+)/(?P<file>.+\.(?P<extension>box|qcow2|raw|tar\.xz|vhd))$";

/// Disc-image key shape:
/// `buildiso-<n>-<word>/<datestamp>/lorax-<major>.<minor>-<arch>.tar.gz`
const DISC_IMAGE_KEY: &str = r"buildiso-\d+-\w+/(?P<datestamp>[0-9]+)/(?P<file>lorax-(?P<major>\d+)\.(?P<minor>\d)-(?P<architecture>\w+)\.tar\.gz)$";

/// Errors from a key that matched the pattern but carries bad field data
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Key {key:?} matched but its datestamp {datestamp:?} is not an integer")]
    BadDatestamp { key: String, datestamp: String },

    #[error("Key {key:?} matched but its datestamp {datestamp:?} is out of range for epoch seconds")]
    DatestampOutOfRange { key: String, datestamp: String },
}

fn epoch_seconds(key: &str, datestamp: &str) -> Result<chrono::DateTime<Utc>, ParseError> {
    let seconds: i64 = datestamp.parse().map_err(|_| ParseError::BadDatestamp {
        key: key.to_string(),
        datestamp: datestamp.to_string(),
    })?;

    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ParseError::DatestampOutOfRange {
            key: key.to_string(),
            datestamp: datestamp.to_string(),
        })
}

/// Compiled pattern for machine-image keys
pub struct MachineImagePattern {
    pattern: Regex,
}

impl MachineImagePattern {
    pub fn new() -> Self {
        Self {
            // Pattern is a constant; compilation cannot fail.
            pattern: Regex::new(MACHINE_IMAGE_KEY).unwrap(),
        }
    }

    /// Attempt to parse one key. `Ok(None)` means the key does not belong
    /// to this pipeline.
    pub fn parse(&self, key: &str) -> Result<Option<MachineImage>, ParseError> {
        let caps = match self.pattern.captures(key) {
            Some(caps) => caps,
            None => return Ok(None),
        };

        let published_at = epoch_seconds(key, &caps["datestamp"])?;

        Ok(Some(MachineImage {
            image_type: caps["type"].to_string(),
            variant: caps
                .name("variant")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            major: caps["major"].to_string(),
            architecture: caps["architecture"].to_string(),
            published_at,
            file: caps["file"].to_string(),
        }))
    }
}

impl Default for MachineImagePattern {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiled pattern for disc-image (lorax tarball) keys
pub struct DiscImagePattern {
    pattern: Regex,
}

impl DiscImagePattern {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(DISC_IMAGE_KEY).unwrap(),
        }
    }

    /// Attempt to parse one key. `Ok(None)` means the key does not belong
    /// to this pipeline.
    pub fn parse(&self, key: &str) -> Result<Option<DiscImage>, ParseError> {
        let caps = match self.pattern.captures(key) {
            Some(caps) => caps,
            None => return Ok(None),
        };

        let published_at = epoch_seconds(key, &caps["datestamp"])?;

        // The matched span, not the raw input: listing keys are full keys,
        // but the pattern is only end-anchored.
        let matched = caps.get(0).map(|m| m.as_str()).unwrap_or(key);

        Ok(Some(DiscImage {
            architecture: caps["architecture"].to_string(),
            major: caps["major"].to_string(),
            minor: caps["minor"].to_string(),
            key: matched.to_string(),
            file: caps["file"].to_string(),
            published_at,
        }))
    }
}

impl Default for DiscImagePattern {
    fn default() -> Self {
        Self::new()
    }
}
