//! Domain models for option catalogues.
//!
//! This module contains the option records, the hierarchy consistency engine
//! that owns a working set of options, the two-phase protocol for structural
//! edits, change tracking, and configuration.

mod config;
pub use config::Config;

/// The working set and its invariants.
pub mod hierarchy;
pub use hierarchy::{Hierarchy, HierarchyError, SetParentOutcome};

/// Option records, identifiers, and catalogue types.
pub mod option;
pub use option::{OptionId, OptionRecord, OptionType, UnknownOptionType};

pub mod pending;
pub use pending::{PendingChange, ProposedChange};

pub mod snapshot;
pub use snapshot::{ChangeTracker, Snapshot};

pub mod top_index;
pub use top_index::{TopEntry, TopIndex};
