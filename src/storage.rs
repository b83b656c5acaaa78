//! Persistence of option catalogues.
//!
//! The [`PersistenceGateway`] is the only contract the editing session
//! relies on. It loads and saves whole catalogues; it does not validate what
//! it is given.

use std::io;

use crate::domain::{OptionRecord, OptionType};

mod json_store;
mod memory;

pub use json_store::JsonStore;
pub use memory::MemoryStore;

/// Loads and saves the raw records of a catalogue.
pub trait PersistenceGateway {
    /// Loads every record of the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, option_type: OptionType) -> Result<Vec<OptionRecord>, StorageError>;

    /// Replaces the catalogue with `records`.
    ///
    /// Records are expected to be pruned and in canonical order already.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(
        &mut self,
        option_type: OptionType,
        records: &[OptionRecord],
    ) -> Result<(), StorageError>;
}

/// Errors raised by a [`PersistenceGateway`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("failed to access option catalogue")]
    Io(#[from] io::Error),
    /// A data file could not be parsed or serialized.
    #[error("malformed option catalogue")]
    Json(#[from] serde_json::Error),
    /// The store is unavailable.
    #[error("option catalogue unavailable: {0}")]
    Unavailable(String),
}
