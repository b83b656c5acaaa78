//! The in-memory working set of an option catalogue.
//!
//! The [`Hierarchy`] knows nothing about where options are stored or how the
//! operator is asked for confirmation. It owns the options of one catalogue,
//! keeps them in canonical order, and guarantees that every parent reference
//! points at a top-level option.
//!
//! Every mutation ends with the same refresh sequence: rebuild the
//! [`TopIndex`], clear parent references that are no longer valid, rebuild the
//! index again if anything was cleared, then re-sort. Callers never observe a
//! stale order or a dangling reference.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use thiserror::Error;
use tracing::instrument;

use crate::domain::{
    option::{OptionId, OptionRecord},
    pending::{PendingChange, ProposedChange},
    snapshot::Snapshot,
    top_index::TopIndex,
};

/// Errors raised by [`Hierarchy`] operations.
///
/// A rejected operation never changes the working set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// No option with this id exists.
    #[error("option {0} not found")]
    UnknownOption(OptionId),
    /// The requested parent is not a top-level option.
    #[error("{0} is not a top-level option and cannot be used as a category")]
    InvalidParent(OptionId),
    /// An option cannot be its own category.
    #[error("option {0} cannot be its own category")]
    SelfReferenceRejected(OptionId),
    /// Another structural change is awaiting confirmation.
    #[error("cannot edit while another change is awaiting confirmation ({0})")]
    PendingChangeConflict(ProposedChange),
    /// The pending change was already resolved, or belongs to another working
    /// set.
    #[error("change is no longer awaiting confirmation ({0})")]
    StalePendingChange(ProposedChange),
    /// Two loaded options share an id.
    #[error("duplicate option id {0}")]
    DuplicateId(OptionId),
    /// The insertion index is past the end of the working set.
    #[error("insertion index {index} is out of range for {len} options")]
    AnchorOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of options.
        len: usize,
    },
}

/// Result of [`Hierarchy::set_parent`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum SetParentOutcome {
    /// The change was applied. Holds the option's new position.
    Applied(usize),
    /// The change moves the option between the top level and a category, and
    /// must be confirmed.
    NeedsConfirmation(PendingChange),
}

/// The working set of one option catalogue.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// Options in canonical order.
    records: Vec<OptionRecord>,

    /// Position of each option in `records`.
    positions: HashMap<OptionId, usize>,

    top_index: TopIndex,

    sentinel_label: String,

    /// The outstanding structural change, if any, keyed by its ticket.
    pending: Option<(u64, ProposedChange)>,
    next_ticket: u64,

    /// The most recently added option, for the UI to bring into view.
    pending_focus: Option<OptionId>,

    /// Top-level options whose sub-options are displayed.
    expanded: HashSet<OptionId>,
}

impl Hierarchy {
    /// Builds a working set from loaded records.
    ///
    /// Parent references that do not point at a top-level option are cleared,
    /// so the loaded options satisfy every invariant of the working set.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::DuplicateId`] if two records share an id.
    #[instrument(level = "debug", skip_all, fields(count = records.len()))]
    pub fn load(
        sentinel_label: impl Into<String>,
        records: Vec<OptionRecord>,
    ) -> Result<Self, HierarchyError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(&record.id) {
                return Err(HierarchyError::DuplicateId(record.id.clone()));
            }
        }

        let sentinel_label = sentinel_label.into();
        let mut hierarchy = Self {
            top_index: TopIndex::build(&sentinel_label, &records),
            positions: HashMap::with_capacity(records.len()),
            records,
            sentinel_label,
            pending: None,
            next_ticket: 0,
            pending_focus: None,
            expanded: HashSet::new(),
        };

        let demoted = hierarchy.refresh();
        if !demoted.is_empty() {
            tracing::warn!(
                "{} option(s) referenced a missing or non top-level category and were moved to \
                 the top level",
                demoted.len()
            );
        }

        Ok(hierarchy)
    }

    /// Creates an empty working set.
    #[must_use]
    pub fn empty(sentinel_label: impl Into<String>) -> Self {
        let sentinel_label = sentinel_label.into();
        Self {
            top_index: TopIndex::build(&sentinel_label, std::iter::empty()),
            records: Vec::new(),
            positions: HashMap::new(),
            sentinel_label,
            pending: None,
            next_ticket: 0,
            pending_focus: None,
            expanded: HashSet::new(),
        }
    }

    /// The number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the working set has no options.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The options in canonical order.
    #[must_use]
    pub fn records(&self) -> &[OptionRecord] {
        &self.records
    }

    /// Iterates over the options in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionRecord> {
        self.records.iter()
    }

    /// Looks up an option by id.
    #[must_use]
    pub fn get(&self, id: &OptionId) -> Option<&OptionRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    /// The position of an option in canonical order.
    #[must_use]
    pub fn position(&self, id: &OptionId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// The label of the category an option is grouped under.
    ///
    /// This is the parent's label for a sub-option, and the option's own label
    /// for a top-level option.
    #[must_use]
    pub fn category_label(&self, id: &OptionId) -> Option<&str> {
        self.get(id)
            .map(|record| category_label(&self.top_index, record))
    }

    /// The parent candidates, "no category" sentinel first.
    #[must_use]
    pub const fn top_index(&self) -> &TopIndex {
        &self.top_index
    }

    /// The label of the "no category" sentinel.
    #[must_use]
    pub fn sentinel_label(&self) -> &str {
        &self.sentinel_label
    }

    /// Top-level options, optionally restricted to the given ids.
    pub fn top_options<'a>(
        &'a self,
        filter: Option<&'a [OptionId]>,
    ) -> impl Iterator<Item = &'a OptionRecord> + 'a {
        self.all_options(filter).filter(|r| !r.is_sub_option())
    }

    /// Sub-options, optionally restricted to the given ids.
    pub fn sub_options<'a>(
        &'a self,
        filter: Option<&'a [OptionId]>,
    ) -> impl Iterator<Item = &'a OptionRecord> + 'a {
        self.all_options(filter).filter(|r| r.is_sub_option())
    }

    /// All options, optionally restricted to the given ids.
    pub fn all_options<'a>(
        &'a self,
        filter: Option<&'a [OptionId]>,
    ) -> impl Iterator<Item = &'a OptionRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| filter.is_none_or(|ids| ids.contains(&r.id)))
    }

    /// The sub-options of a top-level option.
    pub fn children<'a>(&'a self, id: &'a OptionId) -> impl Iterator<Item = &'a OptionRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.parent_id.as_ref() == Some(id))
    }

    /// Options with exactly this label.
    pub fn find_by_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a OptionRecord> + 'a {
        self.records.iter().filter(move |r| r.label == label)
    }

    /// Ids of options whose label is empty or whitespace.
    #[must_use]
    pub fn empty_labels(&self) -> Vec<OptionId> {
        self.records
            .iter()
            .filter(|r| r.label.trim().is_empty())
            .map(|r| r.id.clone())
            .collect()
    }

    /// The normalized content of the working set.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.records)
    }

    /// Compares two options by canonical order: category label, then
    /// top-level before sub-option, then label.
    #[must_use]
    pub fn compare(&self, a: &OptionRecord, b: &OptionRecord) -> Ordering {
        canonical_cmp(&self.top_index, a, b)
    }

    /// Whether the options are in canonical order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| self.compare(&pair[0], &pair[1]) != Ordering::Greater)
    }

    /// The structural change awaiting confirmation, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&ProposedChange> {
        self.pending.as_ref().map(|(_, change)| change)
    }

    /// The most recently added option, if it has not been taken yet.
    #[must_use]
    pub const fn pending_focus(&self) -> Option<&OptionId> {
        self.pending_focus.as_ref()
    }

    /// Takes the most recently added option together with its current
    /// position.
    pub fn take_pending_focus(&mut self) -> Option<(OptionId, usize)> {
        let id = self.pending_focus.take()?;
        let position = self.position(&id)?;
        Some((id, position))
    }

    /// Whether the sub-options of a top-level option are displayed.
    #[must_use]
    pub fn is_expanded(&self, id: &OptionId) -> bool {
        self.expanded.contains(id)
    }

    /// Shows or hides the sub-options of a top-level option.
    ///
    /// Returns whether the sub-options are now displayed.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::UnknownOption`] if the option does not exist,
    /// or [`HierarchyError::InvalidParent`] if it is a sub-option.
    pub fn toggle_expanded(&mut self, id: &OptionId) -> Result<bool, HierarchyError> {
        self.find(id)?;
        if !self.top_index.contains(id) {
            return Err(HierarchyError::InvalidParent(id.clone()));
        }
        if self.expanded.remove(id) {
            Ok(false)
        } else {
            self.expanded.insert(id.clone());
            Ok(true)
        }
    }

    /// Top-level options, plus the sub-options of expanded categories, in
    /// canonical order.
    pub fn visible(&self) -> impl Iterator<Item = &OptionRecord> {
        self.records.iter().filter(|r| {
            r.parent_id
                .as_ref()
                .is_none_or(|parent| self.expanded.contains(parent))
        })
    }

    /// Inserts a new, unlabelled option at `anchor`.
    ///
    /// The option is remembered as the pending focus. Returns its position
    /// after re-sorting.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::PendingChangeConflict`] while a change awaits
    ///   confirmation
    /// - [`HierarchyError::AnchorOutOfRange`] if `anchor` is past the end
    /// - [`HierarchyError::InvalidParent`] if `parent` is not a top-level
    ///   option
    #[instrument(level = "debug", skip(self))]
    pub fn add_option(
        &mut self,
        anchor: usize,
        parent: Option<OptionId>,
    ) -> Result<usize, HierarchyError> {
        self.ensure_no_pending()?;
        if anchor > self.records.len() {
            return Err(HierarchyError::AnchorOutOfRange {
                index: anchor,
                len: self.records.len(),
            });
        }
        self.ensure_valid_parent(parent.as_ref())?;

        let id = loop {
            let candidate = OptionId::generate();
            if !self.positions.contains_key(&candidate) {
                break candidate;
            }
        };

        self.records.insert(
            anchor,
            OptionRecord {
                id: id.clone(),
                label: String::new(),
                parent_id: parent,
            },
        );
        self.pending_focus = Some(id.clone());
        self.refresh();

        let position = self.positions[&id];
        tracing::debug!(%id, position, "added option");
        Ok(position)
    }

    /// Replaces the label of an option and returns its new position.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::PendingChangeConflict`] while a change awaits
    ///   confirmation
    /// - [`HierarchyError::UnknownOption`] if the option does not exist
    #[instrument(level = "debug", skip(self, label))]
    pub fn set_label(
        &mut self,
        id: &OptionId,
        label: impl Into<String>,
    ) -> Result<usize, HierarchyError> {
        self.ensure_no_pending()?;
        let index = self.find(id)?;
        self.records[index].label = label.into();
        self.refresh();
        Ok(self.positions[id])
    }

    /// Proposes removing an option.
    ///
    /// Nothing changes until the returned [`PendingChange`] is committed.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::PendingChangeConflict`] while another change awaits
    ///   confirmation
    /// - [`HierarchyError::UnknownOption`] if the option does not exist
    #[instrument(level = "debug", skip(self))]
    pub fn propose_removal(&mut self, id: &OptionId) -> Result<PendingChange, HierarchyError> {
        self.ensure_no_pending()?;
        let index = self.find(id)?;
        let previous_parent = self.records[index].parent_id.clone();
        Ok(self.propose(ProposedChange::Remove { id: id.clone() }, previous_parent))
    }

    /// Changes the category of an option.
    ///
    /// Moving a sub-option to another category is applied immediately. Moving
    /// an option between the top level and a category is returned as a
    /// [`PendingChange`] which must be committed or cancelled. Setting the
    /// current parent again changes nothing.
    ///
    /// # Errors
    ///
    /// - [`HierarchyError::PendingChangeConflict`] while another change awaits
    ///   confirmation
    /// - [`HierarchyError::UnknownOption`] if the option does not exist
    /// - [`HierarchyError::SelfReferenceRejected`] if `new_parent` is `id`
    /// - [`HierarchyError::InvalidParent`] if `new_parent` is not a top-level
    ///   option
    #[instrument(level = "debug", skip(self))]
    pub fn set_parent(
        &mut self,
        id: &OptionId,
        new_parent: Option<OptionId>,
    ) -> Result<SetParentOutcome, HierarchyError> {
        self.ensure_no_pending()?;
        let index = self.find(id)?;
        if new_parent.as_ref() == Some(id) {
            return Err(HierarchyError::SelfReferenceRejected(id.clone()));
        }
        self.ensure_valid_parent(new_parent.as_ref())?;

        let current = self.records[index].parent_id.clone();
        if current == new_parent {
            return Ok(SetParentOutcome::Applied(index));
        }

        if current.is_some() != new_parent.is_some() {
            let change = ProposedChange::Reparent {
                id: id.clone(),
                new_parent,
            };
            return Ok(SetParentOutcome::NeedsConfirmation(
                self.propose(change, current),
            ));
        }

        let position = self.apply_parent(id, new_parent);
        Ok(SetParentOutcome::Applied(position))
    }

    /// Applies a pending change.
    ///
    /// Returns the new position of a moved option, or `None` for a removal.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::StalePendingChange`] if `pending` is not the
    /// change currently awaiting confirmation.
    #[instrument(level = "debug", skip_all, fields(change = %pending.change))]
    pub fn commit(&mut self, pending: PendingChange) -> Result<Option<usize>, HierarchyError> {
        match self.resolve(pending)? {
            ProposedChange::Remove { id } => {
                let index = self.find(&id)?;
                let removed = self.records.remove(index);
                self.pending_focus = None;
                let demoted = self.refresh();
                tracing::info!(
                    id = %removed.id,
                    label = %removed.label,
                    demoted = demoted.len(),
                    "removed option"
                );
                Ok(None)
            }
            ProposedChange::Reparent { id, new_parent } => {
                self.find(&id)?;
                self.ensure_valid_parent(new_parent.as_ref())?;
                Ok(Some(self.apply_parent(&id, new_parent)))
            }
        }
    }

    /// Discards a pending change. The working set is left as it was when the
    /// change was proposed.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::StalePendingChange`] if `pending` is not the
    /// change currently awaiting confirmation.
    #[instrument(level = "debug", skip_all, fields(change = %pending.change))]
    pub fn cancel(&mut self, pending: PendingChange) -> Result<(), HierarchyError> {
        let change = self.resolve(pending)?;
        tracing::debug!(%change, "cancelled pending change");
        Ok(())
    }

    /// Drops the outstanding pending change without a ticket, unlocking the
    /// working set. Use this when the [`PendingChange`] itself was lost.
    /// The working set is left as it was when the change was proposed.
    pub fn abandon_pending(&mut self) -> Option<ProposedChange> {
        let (_, change) = self.pending.take()?;
        tracing::warn!(%change, "abandoned pending change");
        Some(change)
    }

    /// Rebuilds the [`TopIndex`] from the current top-level options.
    pub fn recalculate_top_index(&mut self) {
        self.top_index = TopIndex::build(&self.sentinel_label, &self.records);
    }

    /// Clears every parent reference that does not point at an entry of the
    /// current [`TopIndex`], moving those options to the top level.
    ///
    /// Returns the ids of the options that were moved.
    pub fn prune_invalid_parents(&mut self) -> Vec<OptionId> {
        let mut pruned = Vec::new();
        for record in &mut self.records {
            let dangling = record
                .parent_id
                .as_ref()
                .is_some_and(|parent| !self.top_index.contains(parent));
            if dangling {
                record.parent_id = None;
                pruned.push(record.id.clone());
            }
        }
        pruned
    }
}

impl Hierarchy {
    /// Rebuilds the index, prunes, and re-sorts. Returns the pruned ids.
    fn refresh(&mut self) -> Vec<OptionId> {
        self.recalculate_top_index();
        let pruned = self.prune_invalid_parents();
        if !pruned.is_empty() {
            tracing::debug!(?pruned, "demoted options with invalid categories");
            self.recalculate_top_index();
        }
        self.sort();

        let top_index = &self.top_index;
        self.expanded.retain(|id| top_index.contains(id));

        pruned
    }

    fn sort(&mut self) {
        let top_index = &self.top_index;
        self.records.sort_by(|a, b| canonical_cmp(top_index, a, b));

        self.positions.clear();
        for (index, record) in self.records.iter().enumerate() {
            self.positions.insert(record.id.clone(), index);
        }
    }

    fn apply_parent(&mut self, id: &OptionId, new_parent: Option<OptionId>) -> usize {
        let index = self.positions[id];
        if let Some(parent) = &new_parent {
            self.expanded.insert(parent.clone());
        }
        self.records[index].parent_id = new_parent;
        self.refresh();

        let position = self.positions[id];
        tracing::info!(%id, position, "changed category");
        position
    }

    fn find(&self, id: &OptionId) -> Result<usize, HierarchyError> {
        self.positions
            .get(id)
            .copied()
            .ok_or_else(|| HierarchyError::UnknownOption(id.clone()))
    }

    fn ensure_valid_parent(&self, parent: Option<&OptionId>) -> Result<(), HierarchyError> {
        match parent {
            Some(parent) if !self.top_index.contains(parent) => {
                Err(HierarchyError::InvalidParent(parent.clone()))
            }
            _ => Ok(()),
        }
    }

    fn ensure_no_pending(&self) -> Result<(), HierarchyError> {
        match &self.pending {
            Some((_, change)) => Err(HierarchyError::PendingChangeConflict(change.clone())),
            None => Ok(()),
        }
    }

    fn propose(
        &mut self,
        change: ProposedChange,
        previous_parent: Option<OptionId>,
    ) -> PendingChange {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some((ticket, change.clone()));
        tracing::debug!(%change, "awaiting confirmation");
        PendingChange {
            ticket,
            change,
            previous_parent,
        }
    }

    fn resolve(&mut self, pending: PendingChange) -> Result<ProposedChange, HierarchyError> {
        match &self.pending {
            Some((ticket, _)) if *ticket == pending.ticket => {
                self.pending = None;
                Ok(pending.change)
            }
            _ => Err(HierarchyError::StalePendingChange(pending.change)),
        }
    }
}

fn category_label<'a>(top_index: &'a TopIndex, record: &'a OptionRecord) -> &'a str {
    record
        .parent_id
        .as_ref()
        .and_then(|parent| top_index.label(parent))
        .unwrap_or(&record.label)
}

fn canonical_cmp(top_index: &TopIndex, a: &OptionRecord, b: &OptionRecord) -> Ordering {
    category_label(top_index, a)
        .cmp(category_label(top_index, b))
        .then_with(|| a.is_sub_option().cmp(&b.is_sub_option()))
        .then_with(|| a.label.cmp(&b.label))
}
