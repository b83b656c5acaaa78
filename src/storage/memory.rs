use std::{cell::Cell, collections::HashMap};

use crate::{
    domain::{OptionRecord, OptionType},
    storage::{PersistenceGateway, StorageError},
};

/// Keeps catalogues in memory.
///
/// The store can be told to fail its next load or save, which is how the
/// editing session's recovery paths are exercised.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    catalogues: HashMap<OptionType, Vec<OptionRecord>>,
    fail_next_load: Cell<bool>,
    fail_next_save: bool,
    saves: usize,
}

impl MemoryStore {
    /// Creates a store holding `records` for `option_type`.
    #[must_use]
    pub fn with_records(option_type: OptionType, records: Vec<OptionRecord>) -> Self {
        let mut store = Self::default();
        store.catalogues.insert(option_type, records);
        store
    }

    /// Replaces the stored records of a catalogue.
    pub fn insert(&mut self, option_type: OptionType, records: Vec<OptionRecord>) {
        self.catalogues.insert(option_type, records);
    }

    /// The stored records of a catalogue.
    #[must_use]
    pub fn records(&self, option_type: OptionType) -> &[OptionRecord] {
        self.catalogues
            .get(&option_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Makes the next load fail.
    pub fn fail_next_load(&self) {
        self.fail_next_load.set(true);
    }

    /// Makes the next save fail.
    pub const fn fail_next_save(&mut self) {
        self.fail_next_save = true;
    }

    /// The number of successful saves.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }
}

impl PersistenceGateway for MemoryStore {
    fn load(&self, option_type: OptionType) -> Result<Vec<OptionRecord>, StorageError> {
        if self.fail_next_load.take() {
            return Err(StorageError::Unavailable(format!(
                "cannot load {option_type}"
            )));
        }
        Ok(self.records(option_type).to_vec())
    }

    fn save(
        &mut self,
        option_type: OptionType,
        records: &[OptionRecord],
    ) -> Result<(), StorageError> {
        if std::mem::take(&mut self.fail_next_save) {
            return Err(StorageError::Unavailable(format!(
                "cannot save {option_type}"
            )));
        }
        self.catalogues.insert(option_type, records.to_vec());
        self.saves += 1;
        Ok(())
    }
}
