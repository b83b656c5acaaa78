//! Two-level option catalogues
//!
//! A catalogue is a flat list of named options (activity tags, city
//! districts, ...) grouped into top-level categories and their sub-options.

pub mod domain;
pub use domain::{
    ChangeTracker, Config, Hierarchy, HierarchyError, OptionId, OptionRecord, OptionType,
    PendingChange, ProposedChange, SetParentOutcome, Snapshot, TopIndex,
};

/// Loading and saving catalogues.
pub mod storage;
pub use storage::{JsonStore, MemoryStore, PersistenceGateway, StorageError};

pub mod session;
pub use session::{ConfirmationGate, Decision, EditingSession, Prompt, Resolution, SessionError};
