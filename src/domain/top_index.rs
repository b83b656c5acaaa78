//! The set of valid parent candidates.

use std::collections::HashMap;

use crate::domain::option::{OptionId, OptionRecord};

/// One selectable parent in the category picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopEntry {
    /// The id of the top-level option, or `None` for the "no category"
    /// sentinel.
    pub id: Option<OptionId>,
    /// Display label.
    pub label: String,
}

/// Derived, read-only view of every top-level option, prefixed by a "no
/// category" sentinel.
///
/// The index is rebuilt from scratch after each structural change. It keeps
/// no state of its own beyond the cached entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopIndex {
    entries: Vec<TopEntry>,
    labels: HashMap<OptionId, usize>,
}

impl TopIndex {
    /// Builds the index from `records`, preserving their order.
    pub fn build<'a>(
        sentinel_label: &str,
        records: impl IntoIterator<Item = &'a OptionRecord>,
    ) -> Self {
        let mut entries = vec![TopEntry {
            id: None,
            label: sentinel_label.to_string(),
        }];
        let mut labels = HashMap::new();

        for record in records.into_iter().filter(|r| r.parent_id.is_none()) {
            labels.insert(record.id.clone(), entries.len());
            entries.push(TopEntry {
                id: Some(record.id.clone()),
                label: record.label.clone(),
            });
        }

        Self { entries, labels }
    }

    /// Whether `id` names a top-level option.
    #[must_use]
    pub fn contains(&self, id: &OptionId) -> bool {
        self.labels.contains_key(id)
    }

    /// Whether `parent` is an acceptable parent reference. `None` always is.
    #[must_use]
    pub fn accepts(&self, parent: Option<&OptionId>) -> bool {
        parent.is_none_or(|id| self.contains(id))
    }

    /// The label of the top-level option `id`.
    #[must_use]
    pub fn label(&self, id: &OptionId) -> Option<&str> {
        self.labels
            .get(id)
            .map(|&index| self.entries[index].label.as_str())
    }

    /// All entries, sentinel first.
    #[must_use]
    pub fn entries(&self) -> &[TopEntry] {
        &self.entries
    }

    /// Number of top-level options, excluding the sentinel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    /// Whether there are no top-level options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_comes_first() {
        let records = [
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::sub_option("B", "Fußball", "A"),
            OptionRecord::top_level("C", "Kultur"),
        ];
        let index = TopIndex::build("(none)", &records);

        let ids: Vec<_> = index.entries().iter().map(|e| e.id.clone()).collect();
        assert_eq!(
            ids,
            vec![None, Some(OptionId::from("A")), Some(OptionId::from("C"))]
        );
        assert_eq!(index.entries()[0].label, "(none)");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn sub_options_are_not_parents() {
        let records = [
            OptionRecord::top_level("A", "Sport"),
            OptionRecord::sub_option("B", "Fußball", "A"),
        ];
        let index = TopIndex::build("(none)", &records);

        assert!(index.contains(&"A".into()));
        assert!(!index.contains(&"B".into()));
        assert!(index.accepts(None));
        assert!(!index.accepts(Some(&"B".into())));
        assert_eq!(index.label(&"A".into()), Some("Sport"));
    }

    #[test]
    fn empty_catalogue_has_only_the_sentinel() {
        let index = TopIndex::build("(none)", &Vec::<OptionRecord>::new());
        assert!(index.is_empty());
        assert_eq!(index.entries().len(), 1);
    }
}
