//! Artifact records extracted from object-storage keys
//!
//! A build artifact is identified entirely by its key in the bucket; there
//! is no sidecar metadata. The key parser in [`pattern`] turns a key into
//! one of the two record types here, or nothing when the key belongs to
//! something else in the bucket.

mod pattern;

pub use pattern::{DiscImagePattern, MachineImagePattern, ParseError};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A published machine image (cloud image, vagrant box, raw disk, ...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineImage {
    /// Image subtype, e.g. "GenericCloud" or "EC2"
    pub image_type: String,

    /// Hardware variant, e.g. "LVM"; empty when the key carries none
    pub variant: String,

    /// Major release version digits from the key
    pub major: String,

    /// CPU architecture, e.g. "x86_64"
    pub architecture: String,

    /// Publish timestamp, from the datestamp path segment as epoch seconds
    pub published_at: DateTime<Utc>,

    /// File name of the artifact itself
    pub file: String,
}

impl MachineImage {
    /// Grouping identity: the subtype, with the hardware variant appended
    /// when present ("GenericCloud-LVM").
    pub fn type_variant(&self) -> String {
        if self.variant.is_empty() {
            self.image_type.clone()
        } else {
            format!("{}-{}", self.image_type, self.variant)
        }
    }
}

impl fmt::Display for MachineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.type_variant(),
            self.architecture,
            self.major,
            self.published_at.format("%Y-%m-%d %H:%M:%S"),
            self.file
        )
    }
}

/// A published installer disc image (lorax tarball)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscImage {
    /// CPU architecture, e.g. "x86_64"
    pub architecture: String,

    /// Major release version digits from the file name
    pub major: String,

    /// Minor release version digit from the file name
    pub minor: String,

    /// The full object key the record was parsed from
    pub key: String,

    /// File name of the artifact itself
    pub file: String,

    /// Publish timestamp, from the datestamp path segment as epoch seconds
    pub published_at: DateTime<Utc>,
}

impl fmt::Display for DiscImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} {} {}",
            self.architecture,
            self.major,
            self.minor,
            self.published_at.format("%Y-%m-%d %H:%M:%S"),
            self.file
        )
    }
}
