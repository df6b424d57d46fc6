//! Operator utilities for the Rocky Linux cloud image publishing pipeline
//!
//! Three jobs, one crate:
//! - find the most recently published build artifact (machine image or
//!   installer ISO) for a release from the artifact bucket,
//! - compare public machine-image inventories across regions,
//! - audit and request per-region "Public AMIs" quota increases.
//!
//! The interesting part is the latest-artifact selection: an unordered,
//! heterogeneous key listing is classified against a fixed pattern, grouped
//! by composite identity, and reduced to the newest record per group. That
//! core is pure; all cloud access sits behind traits, with `aws`-CLI-backed
//! implementations in [`aws`].

pub mod artifact;
pub mod aws;
pub mod config;
pub mod listing;
pub mod quota;
pub mod regions;
pub mod select;
pub mod version;

pub use artifact::{DiscImage, MachineImage, ParseError};
pub use config::ToolConfig;
pub use listing::{find_latest_images, find_latest_isos, ObjectLister, PipelineError};
pub use version::ReleaseVersion;
