//! Latest-per-group selection
//!
//! Both pipelines reduce to the same fold: group parsed records by a
//! composite identity and keep the record with the greatest publish
//! timestamp per group. The fold consumes the whole input before anything
//! is emitted, and replacement requires a strictly greater timestamp, so on
//! an exact tie the record seen first is kept.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::artifact::{DiscImage, MachineImage};

/// Identity labels excluded from machine-image results. Early images of
/// these two types were named differently and must never win "latest".
pub const LEGACY_IDENTITIES: [&str; 2] = ["GenericCloud", "EC2"];

/// A record that can compete for "latest" within its identity group
pub trait GroupLatest {
    /// Composite grouping key; records with equal keys compete.
    type Key: Eq + Hash;

    fn group_key(&self) -> Self::Key;

    fn published_at(&self) -> DateTime<Utc>;

    /// Excluded records never enter the selection, regardless of recency.
    fn excluded(&self) -> bool {
        false
    }
}

impl GroupLatest for MachineImage {
    type Key = (String, String);

    fn group_key(&self) -> Self::Key {
        (self.type_variant(), self.architecture.clone())
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    fn excluded(&self) -> bool {
        let identity = self.type_variant();
        LEGACY_IDENTITIES.iter().any(|legacy| identity == *legacy)
    }
}

impl GroupLatest for DiscImage {
    type Key = String;

    fn group_key(&self) -> Self::Key {
        self.architecture.clone()
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}

/// Fold a record stream down to the latest per group.
pub fn latest_by_group<T, I>(records: I) -> HashMap<T::Key, T>
where
    T: GroupLatest,
    I: IntoIterator<Item = T>,
{
    let mut latest: HashMap<T::Key, T> = HashMap::new();

    for record in records {
        if record.excluded() {
            continue;
        }

        match latest.entry(record.group_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.published_at() > slot.get().published_at() {
                    slot.insert(record);
                }
            }
        }
    }

    latest
}

/// Flatten the finalized map into a record sequence. No ordering is
/// imposed; callers that print sort first.
pub fn into_records<T: GroupLatest>(latest: HashMap<T::Key, T>) -> Vec<T> {
    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image(image_type: &str, variant: &str, arch: &str, stamp: i64) -> MachineImage {
        MachineImage {
            image_type: image_type.to_string(),
            variant: variant.to_string(),
            major: "9".to_string(),
            architecture: arch.to_string(),
            published_at: Utc.timestamp_opt(stamp, 0).single().unwrap(),
            file: format!("{image_type}-{stamp}.qcow2"),
        }
    }

    #[test]
    fn keeps_maximum_timestamp_per_group() {
        let latest = latest_by_group(vec![
            image("GenericCloud", "LVM", "x86_64", 20230501),
            image("GenericCloud", "LVM", "x86_64", 20230601),
            image("GenericCloud", "LVM", "x86_64", 20230401),
        ]);

        assert_eq!(latest.len(), 1);
        let kept = &latest[&("GenericCloud-LVM".to_string(), "x86_64".to_string())];
        assert_eq!(kept.published_at.timestamp(), 20230601);
    }

    #[test]
    fn architectures_are_separate_groups() {
        let latest = latest_by_group(vec![
            image("GenericCloud", "LVM", "x86_64", 20230501),
            image("GenericCloud", "LVM", "aarch64", 20230401),
        ]);
        assert_eq!(latest.len(), 2);
    }

    #[test]
    fn equal_timestamps_keep_first_encountered() {
        let mut first = image("Azure", "", "x86_64", 20230501);
        first.file = "first.vhd".to_string();
        let mut second = image("Azure", "", "x86_64", 20230501);
        second.file = "second.vhd".to_string();

        let latest = latest_by_group(vec![first, second]);
        let kept = &latest[&("Azure".to_string(), "x86_64".to_string())];
        assert_eq!(kept.file, "first.vhd");
    }

    #[test]
    fn legacy_identities_never_selected() {
        let latest = latest_by_group(vec![
            image("GenericCloud", "", "x86_64", 20991231),
            image("EC2", "", "x86_64", 20991231),
            image("EC2", "Base", "x86_64", 20230501),
        ]);

        // Bare GenericCloud and EC2 are legacy; EC2-Base is not.
        assert_eq!(latest.len(), 1);
        assert!(latest.contains_key(&("EC2-Base".to_string(), "x86_64".to_string())));
    }

    #[test]
    fn selection_is_order_independent() {
        let records = vec![
            image("GenericCloud", "LVM", "x86_64", 20230501),
            image("GenericCloud", "LVM", "x86_64", 20230601),
            image("Azure", "", "x86_64", 20230301),
            image("Azure", "", "aarch64", 20230302),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let forward = latest_by_group(records);
        let backward = latest_by_group(reversed);

        assert_eq!(forward.len(), backward.len());
        for (key, record) in &forward {
            assert_eq!(backward[key], *record);
        }
    }
}
