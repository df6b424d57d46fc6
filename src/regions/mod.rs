//! Cross-region public image inventory comparison
//!
//! Publishing copies every public image to every region; this module finds
//! regions that fell behind. The inventory of one source region is the
//! reference set, every other region is fetched in parallel, and the diff
//! is by image name. A region whose fetch fails is reported in the log and
//! left out of the comparison, matching how the operators run it: one bad
//! region should not hide the state of the rest.

use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One public machine image as the cloud provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicImage {
    pub id: String,
    pub name: String,
}

/// Supplies the region list and per-region public image inventories
pub trait ImageInventory: Sync {
    fn regions(&self) -> Result<Vec<String>, InventoryError>;

    fn public_images(&self, region: &str) -> Result<Vec<PublicImage>, InventoryError>;
}

/// Errors from the inventory collaborator
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Fetching public images in {region} failed: {reason}")]
    Fetch { region: String, reason: String },

    #[error("Listing regions failed: {reason}")]
    Regions { reason: String },
}

/// Comparison result for one region against the source region
#[derive(Debug, Clone, Serialize)]
pub struct RegionComparison {
    pub region: String,

    /// Total public images present in this region
    pub total_images: usize,

    /// Source-region image names absent here, sorted
    pub missing: Vec<String>,
}

impl RegionComparison {
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare every region against `source_region`, most-missing first.
///
/// A failure to fetch the source inventory aborts the comparison; per-region
/// fetch failures only drop that region from the report.
pub fn compare_regions(
    inventory: &dyn ImageInventory,
    source_region: &str,
    regions: &[String],
) -> Result<Vec<RegionComparison>, InventoryError> {
    let source = inventory.public_images(source_region)?;
    let source_names: HashSet<&str> = source.iter().map(|image| image.name.as_str()).collect();
    info!(
        region = source_region,
        count = source.len(),
        "fetched public images from source region"
    );

    let comparisons: Mutex<Vec<RegionComparison>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for region in regions {
            if region == source_region {
                continue;
            }

            let source_names = &source_names;
            let comparisons = &comparisons;
            scope.spawn(move || {
                let images = match inventory.public_images(region) {
                    Ok(images) => images,
                    Err(err) => {
                        warn!(%region, error = %err, "skipping region: could not list public images");
                        return;
                    }
                };

                let present: HashSet<&str> =
                    images.iter().map(|image| image.name.as_str()).collect();

                let mut missing: Vec<String> = source_names
                    .iter()
                    .filter(|name| !present.contains(**name))
                    .map(|name| name.to_string())
                    .collect();
                missing.sort();

                comparisons.lock().unwrap().push(RegionComparison {
                    region: region.clone(),
                    total_images: images.len(),
                    missing,
                });
            });
        }
    });

    let mut comparisons = comparisons.into_inner().unwrap();
    comparisons.sort_by(|a, b| {
        b.missing_count()
            .cmp(&a.missing_count())
            .then_with(|| a.region.cmp(&b.region))
    });

    Ok(comparisons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeInventory {
        images: HashMap<String, Vec<PublicImage>>,
        broken: HashSet<String>,
    }

    impl FakeInventory {
        fn new() -> Self {
            Self {
                images: HashMap::new(),
                broken: HashSet::new(),
            }
        }

        fn with_region(mut self, region: &str, names: &[&str]) -> Self {
            let images = names
                .iter()
                .enumerate()
                .map(|(i, name)| PublicImage {
                    id: format!("ami-{region}-{i}"),
                    name: name.to_string(),
                })
                .collect();
            self.images.insert(region.to_string(), images);
            self
        }

        fn with_broken_region(mut self, region: &str) -> Self {
            self.broken.insert(region.to_string());
            self
        }
    }

    impl ImageInventory for FakeInventory {
        fn regions(&self) -> Result<Vec<String>, InventoryError> {
            let mut regions: Vec<String> = self.images.keys().cloned().collect();
            regions.extend(self.broken.iter().cloned());
            regions.sort();
            Ok(regions)
        }

        fn public_images(&self, region: &str) -> Result<Vec<PublicImage>, InventoryError> {
            if self.broken.contains(region) {
                return Err(InventoryError::Fetch {
                    region: region.to_string(),
                    reason: "simulated outage".to_string(),
                });
            }
            Ok(self.images.get(region).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn reports_missing_images_most_missing_first() {
        let inventory = FakeInventory::new()
            .with_region("us-east-1", &["a", "b", "c"])
            .with_region("eu-west-1", &["a", "b", "c"])
            .with_region("ap-south-1", &["a"])
            .with_region("sa-east-1", &["a", "b"]);
        let regions = inventory.regions().unwrap();

        let report = compare_regions(&inventory, "us-east-1", &regions).unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report[0].region, "ap-south-1");
        assert_eq!(report[0].missing, vec!["b", "c"]);
        assert_eq!(report[1].region, "sa-east-1");
        assert_eq!(report[1].missing, vec!["c"]);
        assert_eq!(report[2].region, "eu-west-1");
        assert!(report[2].is_complete());
    }

    #[test]
    fn broken_region_is_dropped_from_report() {
        let inventory = FakeInventory::new()
            .with_region("us-east-1", &["a"])
            .with_region("eu-west-1", &["a"])
            .with_broken_region("me-central-1");
        let regions = inventory.regions().unwrap();

        let report = compare_regions(&inventory, "us-east-1", &regions).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].region, "eu-west-1");
    }

    #[test]
    fn source_region_failure_is_fatal() {
        let inventory = FakeInventory::new()
            .with_region("eu-west-1", &["a"])
            .with_broken_region("us-east-1");
        let regions = inventory.regions().unwrap();

        let err = compare_regions(&inventory, "us-east-1", &regions).unwrap_err();
        assert!(matches!(err, InventoryError::Fetch { .. }));
    }
}
