//! Listing source boundary and the two latest-artifact pipelines
//!
//! The object listing is an injected collaborator: the pipelines consume a
//! flat, unordered sequence of keys and never touch the storage client
//! directly. Pagination is the lister's problem; the fold here sees the
//! fully retrieved sequence.

use tracing::info;

use crate::artifact::{
    DiscImage, DiscImagePattern, MachineImage, MachineImagePattern, ParseError,
};
use crate::select;
use crate::version::ReleaseVersion;

/// Supplies object keys for a bucket/prefix
pub trait ObjectLister {
    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ListingError>;
}

/// Errors from the listing collaborator
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Listing bucket {bucket:?} with prefix {prefix:?} failed: {reason}")]
    Retrieval {
        bucket: String,
        prefix: String,
        reason: String,
    },
}

/// Errors that abort a latest-artifact run. Either kind discards all work
/// accumulated in the run; no partial results are emitted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Find the most recently published machine image per (type-variant,
/// architecture) pair for a release.
pub fn find_latest_images(
    lister: &dyn ObjectLister,
    bucket: &str,
    prefix: Option<&str>,
    version: ReleaseVersion,
) -> Result<Vec<MachineImage>, PipelineError> {
    let prefix = match prefix {
        Some(p) => p.to_string(),
        None => version.image_prefix(),
    };

    info!(%bucket, %prefix, "looking for machine images under prefix");
    let keys = lister.list_keys(bucket, &prefix)?;
    info!(count = keys.len(), "keys returned for prefix");

    let pattern = MachineImagePattern::new();
    let mut parsed = Vec::with_capacity(keys.len());
    for key in &keys {
        if let Some(image) = pattern.parse(key)? {
            parsed.push(image);
        }
    }

    Ok(select::into_records(select::latest_by_group(parsed)))
}

/// Find the most recently published installer disc image per architecture
/// for a release.
pub fn find_latest_isos(
    lister: &dyn ObjectLister,
    bucket: &str,
    prefix: Option<&str>,
    version: ReleaseVersion,
) -> Result<Vec<DiscImage>, PipelineError> {
    let prefix = match prefix {
        Some(p) => p.to_string(),
        None => version.iso_prefix(),
    };

    info!(%bucket, %prefix, "looking for ISOs under prefix");
    let keys = lister.list_keys(bucket, &prefix)?;
    info!(count = keys.len(), "keys returned for prefix");

    let pattern = DiscImagePattern::new();
    let mut parsed = Vec::with_capacity(keys.len());
    for key in &keys {
        if let Some(iso) = pattern.parse(key)? {
            parsed.push(iso);
        }
    }

    Ok(select::into_records(select::latest_by_group(parsed)))
}
