//! An editing session over one option catalogue.
//!
//! The [`EditingSession`] owns the working set for as long as the operator
//! edits one catalogue. It loads and saves through a [`PersistenceGateway`]
//! and routes every destructive edit through a [`ConfirmationGate`] before
//! committing it.

use tracing::instrument;

use crate::{
    domain::{
        ChangeTracker, Hierarchy, HierarchyError, OptionId, OptionRecord, OptionType,
        PendingChange, SetParentOutcome,
    },
    storage::{PersistenceGateway, StorageError},
};

mod gate;
pub use gate::{ConfirmationGate, Decision, Prompt};

/// Errors raised by an [`EditingSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The edit was rejected by the working set. Nothing changed.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    /// Loading or saving failed. After a failed save the working set is kept,
    /// still dirty, so the save can be retried.
    #[error("persistence failure")]
    Persistence(#[from] StorageError),
    /// Some options have no label. Nothing was saved.
    #[error("{} option(s) have no label", .0.len())]
    EmptyLabels(Vec<OptionId>),
}

/// How a confirmed edit was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The edit was applied.
    Committed {
        /// The new position of a moved option. `None` for a removal.
        position: Option<usize>,
    },
    /// The operator declined. The working set is unchanged.
    Cancelled {
        /// The parent the option still has, to restore any bound input.
        previous_parent: Option<OptionId>,
    },
}

impl Resolution {
    /// Whether the edit was applied.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// The working set of one catalogue together with its collaborators.
#[derive(Debug)]
pub struct EditingSession<G, C> {
    gateway: G,
    gate: C,
    sentinel_label: String,
    option_type: OptionType,
    hierarchy: Hierarchy,
    tracker: ChangeTracker,
}

impl<G, C> EditingSession<G, C>
where
    G: PersistenceGateway,
    C: ConfirmationGate,
{
    /// Loads a catalogue and starts editing it.
    ///
    /// # Errors
    ///
    /// Fails if the catalogue cannot be loaded, or if it contains duplicate
    /// ids.
    #[instrument(skip(gateway, gate, sentinel_label))]
    pub fn open(
        gateway: G,
        gate: C,
        option_type: OptionType,
        sentinel_label: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let sentinel_label = sentinel_label.into();
        let hierarchy = load(&gateway, option_type, &sentinel_label)?;
        let tracker = ChangeTracker::new(&hierarchy);

        Ok(Self {
            gateway,
            gate,
            sentinel_label,
            option_type,
            hierarchy,
            tracker,
        })
    }

    /// The catalogue being edited.
    pub const fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// The working set.
    pub const fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// The persistence gateway.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Whether the working set differs from what was loaded.
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(&self.hierarchy)
    }

    /// Inserts a new, unlabelled option. See [`Hierarchy::add_option`].
    ///
    /// # Errors
    ///
    /// Fails if the anchor or parent is invalid.
    pub fn add_option(
        &mut self,
        anchor: usize,
        parent: Option<OptionId>,
    ) -> Result<usize, SessionError> {
        Ok(self.hierarchy.add_option(anchor, parent)?)
    }

    /// Relabels an option. See [`Hierarchy::set_label`].
    ///
    /// # Errors
    ///
    /// Fails if the option does not exist.
    pub fn set_label(
        &mut self,
        id: &OptionId,
        label: impl Into<String>,
    ) -> Result<usize, SessionError> {
        Ok(self.hierarchy.set_label(id, label)?)
    }

    /// Shows or hides the sub-options of a category. See
    /// [`Hierarchy::toggle_expanded`].
    ///
    /// # Errors
    ///
    /// Fails if the option does not exist or is not a top-level option.
    pub fn toggle_expanded(&mut self, id: &OptionId) -> Result<bool, SessionError> {
        Ok(self.hierarchy.toggle_expanded(id)?)
    }

    /// Removes an option once the operator confirms.
    ///
    /// # Errors
    ///
    /// Fails if the option does not exist.
    #[instrument(skip(self), fields(option_type = %self.option_type))]
    pub fn remove_option(&mut self, id: &OptionId) -> Result<Resolution, SessionError> {
        let pending = self.hierarchy.propose_removal(id)?;
        let prompt = Prompt::RemoveOption {
            label: self.label_of(id),
            option_type: self.option_type,
        };
        self.resolve(pending, &prompt)
    }

    /// Changes the category of an option.
    ///
    /// Moves between the top level and a category are applied only once the
    /// operator confirms; other moves are applied directly.
    ///
    /// # Errors
    ///
    /// Fails if the option does not exist, if the new parent is the option
    /// itself, or if the new parent is not a top-level option.
    #[instrument(skip(self), fields(option_type = %self.option_type))]
    pub fn set_parent(
        &mut self,
        id: &OptionId,
        new_parent: Option<OptionId>,
    ) -> Result<Resolution, SessionError> {
        match self.hierarchy.set_parent(id, new_parent)? {
            SetParentOutcome::Applied(position) => Ok(Resolution::Committed {
                position: Some(position),
            }),
            SetParentOutcome::NeedsConfirmation(pending) => {
                let prompt = Prompt::ChangeCategoryLevel {
                    label: self.label_of(id),
                    option_type: self.option_type,
                };
                self.resolve(pending, &prompt)
            }
        }
    }

    /// Reloads the catalogue, or switches to another one, discarding unsaved
    /// changes once the operator confirms.
    ///
    /// Returns `false` if the operator declined. If loading fails the current
    /// working set is kept.
    ///
    /// # Errors
    ///
    /// Fails if the catalogue cannot be loaded.
    #[instrument(skip(self))]
    pub fn reset(&mut self, option_type: Option<OptionType>) -> Result<bool, SessionError> {
        if self.is_dirty() && self.gate.confirm(&Prompt::DiscardChanges) == Decision::Rejected {
            return Ok(false);
        }

        let option_type = option_type.unwrap_or(self.option_type);
        let hierarchy = load(&self.gateway, option_type, &self.sentinel_label)?;
        self.option_type = option_type;
        self.replace(hierarchy);
        Ok(true)
    }

    /// Whether the operator may leave the editor. Asks first if there are
    /// unsaved changes.
    pub fn can_leave(&mut self) -> bool {
        !self.is_dirty() || self.gate.confirm(&Prompt::DiscardChanges) == Decision::Accepted
    }

    /// Saves the working set and makes it the new baseline.
    ///
    /// # Errors
    ///
    /// - [`SessionError::EmptyLabels`] if any option has no label
    /// - [`SessionError::Persistence`] if the save fails; the working set is
    ///   kept unchanged and stays dirty
    #[instrument(skip(self), fields(option_type = %self.option_type))]
    pub fn submit(&mut self) -> Result<(), SessionError> {
        if let Some(change) = self.hierarchy.pending() {
            return Err(HierarchyError::PendingChangeConflict(change.clone()).into());
        }

        let empty = self.hierarchy.empty_labels();
        if !empty.is_empty() {
            return Err(SessionError::EmptyLabels(empty));
        }

        let records: Vec<OptionRecord> = self.hierarchy.records().to_vec();
        if let Err(e) = self.gateway.save(self.option_type, &records) {
            tracing::warn!("Failed to save {} options: {e}", self.option_type);
            return Err(e.into());
        }

        tracing::info!("Saved {} {} options", records.len(), self.option_type);
        let hierarchy = Hierarchy::load(self.sentinel_label.clone(), records)?;
        self.replace(hierarchy);
        Ok(())
    }
}

impl<G, C> EditingSession<G, C>
where
    G: PersistenceGateway,
    C: ConfirmationGate,
{
    fn resolve(
        &mut self,
        pending: PendingChange,
        prompt: &Prompt,
    ) -> Result<Resolution, SessionError> {
        match self.gate.confirm(prompt) {
            Decision::Accepted => {
                let position = self.hierarchy.commit(pending)?;
                Ok(Resolution::Committed { position })
            }
            Decision::Rejected => {
                let previous_parent = pending.previous_parent().cloned();
                self.hierarchy.cancel(pending)?;
                Ok(Resolution::Cancelled { previous_parent })
            }
        }
    }

    fn replace(&mut self, hierarchy: Hierarchy) {
        self.tracker = ChangeTracker::new(&hierarchy);
        self.hierarchy = hierarchy;
    }

    fn label_of(&self, id: &OptionId) -> String {
        self.hierarchy
            .get(id)
            .map(|record| record.label.clone())
            .unwrap_or_default()
    }
}

fn load<G: PersistenceGateway>(
    gateway: &G,
    option_type: OptionType,
    sentinel_label: &str,
) -> Result<Hierarchy, SessionError> {
    let records = gateway.load(option_type)?;
    tracing::debug!("Loaded {} {option_type} options", records.len());
    Ok(Hierarchy::load(sentinel_label, records)?)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::storage::MemoryStore;

    /// Answers prompts from a script and records what was asked.
    #[derive(Debug, Default)]
    struct Scripted {
        answers: VecDeque<Decision>,
        asked: Vec<Prompt>,
    }

    impl Scripted {
        fn answering(answers: impl IntoIterator<Item = Decision>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl ConfirmationGate for Scripted {
        fn confirm(&mut self, prompt: &Prompt) -> Decision {
            self.asked.push(prompt.clone());
            self.answers
                .pop_front()
                .expect("unexpected confirmation prompt")
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::with_records(
            OptionType::Activities,
            vec![
                OptionRecord::top_level("A", "Sport"),
                OptionRecord::sub_option("B", "Fußball", "A"),
            ],
        )
    }

    fn session(answers: impl IntoIterator<Item = Decision>) -> EditingSession<MemoryStore, Scripted> {
        EditingSession::open(
            store(),
            Scripted::answering(answers),
            OptionType::Activities,
            "(none)",
        )
        .unwrap()
    }

    #[test]
    fn confirmed_removal_demotes_sub_options() {
        let mut session = session([Decision::Accepted]);

        let resolution = session.remove_option(&"A".into()).unwrap();

        assert_eq!(resolution, Resolution::Committed { position: None });
        assert_eq!(
            session.hierarchy().records(),
            [OptionRecord::top_level("B", "Fußball")]
        );
        assert!(session.is_dirty());
        assert_eq!(
            session.gate.asked,
            [Prompt::RemoveOption {
                label: "Sport".to_string(),
                option_type: OptionType::Activities,
            }]
        );
    }

    #[test]
    fn declined_move_restores_previous_parent() {
        let mut session = session([Decision::Rejected]);

        let resolution = session.set_parent(&"B".into(), None).unwrap();

        assert_eq!(
            resolution,
            Resolution::Cancelled {
                previous_parent: Some("A".into())
            }
        );
        assert!(!session.is_dirty());
        assert!(session.hierarchy().pending().is_none());
    }

    #[test]
    fn moves_within_sub_options_need_no_confirmation() {
        let mut session = session([]);
        session
            .set_parent(&"B".into(), Some("A".into()))
            .unwrap();
        let position = session.add_option(0, None).unwrap();
        let id = session.hierarchy().records()[position].id.clone();
        session.set_label(&id, "Culture").unwrap();

        // "Culture" is top-level; Fußball moves under it without a prompt.
        let resolution = session.set_parent(&"B".into(), Some(id.clone())).unwrap();

        assert!(resolution.is_committed());
        assert_eq!(
            session.hierarchy().get(&"B".into()).unwrap().parent_id,
            Some(id)
        );
    }

    #[test]
    fn self_reference_is_rejected_without_prompting() {
        let mut session = session([]);

        let err = session.set_parent(&"A".into(), Some("A".into())).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Hierarchy(HierarchyError::SelfReferenceRejected(_))
        ));
        assert!(session.gate.asked.is_empty());
    }

    #[test]
    fn submit_saves_and_rebaselines() {
        let mut session = session([]);
        session.set_label(&"B".into(), "Handball").unwrap();
        assert!(session.is_dirty());

        session.submit().unwrap();

        assert!(!session.is_dirty());
        assert_eq!(session.gateway().saves(), 1);
        assert_eq!(
            session.gateway().records(OptionType::Activities),
            [
                OptionRecord::top_level("A", "Sport"),
                OptionRecord::sub_option("B", "Handball", "A"),
            ]
        );
    }

    #[test]
    fn failed_save_keeps_changes_for_retry() {
        let mut session = session([]);
        session.set_label(&"B".into(), "Handball").unwrap();
        session.gateway.fail_next_save();

        let err = session.submit().unwrap_err();

        assert!(matches!(err, SessionError::Persistence(_)));
        assert!(session.is_dirty());
        assert_eq!(
            session.hierarchy().get(&"B".into()).unwrap().label,
            "Handball"
        );

        session.submit().unwrap();
        assert!(!session.is_dirty());
    }

    #[test]
    fn submit_requires_labels() {
        let mut session = session([]);
        let position = session.add_option(2, Some("A".into())).unwrap();
        let id = session.hierarchy().records()[position].id.clone();

        let err = session.submit().unwrap_err();

        let SessionError::EmptyLabels(ids) = err else {
            panic!("expected missing labels to be reported");
        };
        assert_eq!(ids, [id]);
        assert_eq!(session.gateway().saves(), 0);
    }

    #[test]
    fn reset_asks_before_discarding_changes() {
        let mut session = session([Decision::Rejected, Decision::Accepted]);
        session.set_label(&"A".into(), "Sports").unwrap();

        assert!(!session.reset(None).unwrap());
        assert!(session.is_dirty());

        assert!(session.reset(None).unwrap());
        assert!(!session.is_dirty());
        assert_eq!(session.hierarchy().get(&"A".into()).unwrap().label, "Sport");
    }

    #[test]
    fn clean_reset_switches_catalogue_without_prompting() {
        let mut session = session([]);
        session.gateway.insert(
            OptionType::Districts,
            vec![OptionRecord::top_level("north", "North")],
        );

        assert!(session.reset(Some(OptionType::Districts)).unwrap());

        assert_eq!(session.option_type(), OptionType::Districts);
        assert_eq!(session.hierarchy().len(), 1);
        assert!(session.gate.asked.is_empty());
    }

    #[test]
    fn failed_reload_keeps_working_set() {
        let mut session = session([]);
        session.gateway.fail_next_load();

        let err = session.reset(Some(OptionType::Districts)).unwrap_err();

        assert!(matches!(err, SessionError::Persistence(_)));
        assert_eq!(session.option_type(), OptionType::Activities);
        assert_eq!(session.hierarchy().len(), 2);
    }

    #[test]
    fn failed_load_creates_no_session() {
        let store = store();
        store.fail_next_load();

        let result = EditingSession::open(
            store,
            |_: &Prompt| Decision::Accepted,
            OptionType::Activities,
            "(none)",
        );

        assert!(matches!(result, Err(SessionError::Persistence(_))));
    }

    #[test]
    fn leaving_asks_only_when_dirty() {
        let mut session = session([Decision::Rejected]);
        assert!(session.can_leave());

        session.set_label(&"A".into(), "Sports").unwrap();
        assert!(!session.can_leave());
        assert_eq!(session.gate.asked, [Prompt::DiscardChanges]);
    }
}
