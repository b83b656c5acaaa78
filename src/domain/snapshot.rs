//! Change tracking.
//!
//! A [`Snapshot`] is the normalized content of a working set: only the
//! persisted fields, ordered by id, so that two working sets holding the same
//! options in a different display order compare equal.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::domain::{
    hierarchy::Hierarchy,
    option::{OptionId, OptionRecord},
};

/// The persisted fields of a single option.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, BorshSerialize)]
pub struct SnapshotEntry {
    /// The option's id.
    pub id: String,
    /// The option's label.
    pub label: String,
    /// The option's parent id, if any.
    pub parent_id: Option<String>,
}

impl From<&OptionRecord> for SnapshotEntry {
    fn from(record: &OptionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            label: record.label.clone(),
            parent_id: record.parent_id.as_ref().map(OptionId::to_string),
        }
    }
}

/// Normalized, order-insensitive view of a working set.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Captures the given records.
    pub fn capture<'a>(records: impl IntoIterator<Item = &'a OptionRecord>) -> Self {
        let mut entries: Vec<SnapshotEntry> = records.into_iter().map(SnapshotEntry::from).collect();
        entries.sort();
        Self { entries }
    }

    /// The captured entries, ordered by id.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// SHA-256 of the Borsh encoding of the snapshot, as lower-case hex.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data structure).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        // encode using [borsh](https://borsh.io/)
        let encoded = borsh::to_vec(self).expect("this should never fail");
        let hash = Sha256::digest(encoded);
        format!("{hash:x}")
    }
}

/// Whether `current` differs from `baseline`.
#[must_use]
pub fn is_dirty(baseline: &Snapshot, current: &Snapshot) -> bool {
    baseline != current
}

/// Remembers the state of a working set as it was loaded.
///
/// The baseline is fixed for the lifetime of the tracker. After a successful
/// save the caller reloads, which creates a new tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTracker {
    baseline: Snapshot,
}

impl ChangeTracker {
    /// Captures the current state of `hierarchy` as the baseline.
    #[must_use]
    pub fn new(hierarchy: &Hierarchy) -> Self {
        Self {
            baseline: hierarchy.snapshot(),
        }
    }

    /// The baseline snapshot.
    #[must_use]
    pub const fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    /// Whether `hierarchy` has diverged from the baseline.
    #[must_use]
    pub fn is_dirty(&self, hierarchy: &Hierarchy) -> bool {
        is_dirty(&self.baseline, &hierarchy.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_order_does_not_matter() {
        let a = [
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::sub_option("B", "Fußball", "A"),
        ];
        let b = [a[1].clone(), a[0].clone()];

        assert_eq!(Snapshot::capture(&a), Snapshot::capture(&b));
        assert_eq!(
            Snapshot::capture(&a).fingerprint(),
            Snapshot::capture(&b).fingerprint()
        );
    }

    #[test]
    fn parent_change_is_detected() {
        let before = [
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::sub_option("B", "Fußball", "A"),
        ];
        let after = [
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::top_level("B", "Fußball"),
        ];

        let baseline = Snapshot::capture(&before);
        let current = Snapshot::capture(&after);
        assert!(is_dirty(&baseline, &current));
        assert_ne!(baseline.fingerprint(), current.fingerprint());
    }

    #[test]
    fn entries_are_ordered_by_id() {
        let records = [
            OptionRecord::top_level("2", "Apple"),
            OptionRecord::top_level("1", "Zebra"),
        ];
        let snapshot = Snapshot::capture(&records);
        let ids: Vec<_> = snapshot.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }
}
