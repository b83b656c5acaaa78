//! Two-phase structural edits.
//!
//! Removing an option, and moving an option between the top level and a
//! category, are proposed first and only applied once the proposal is
//! confirmed. The proposal is a [`PendingChange`]; the owning
//! [`Hierarchy`](crate::Hierarchy) accepts at most one at a time.

use std::fmt;

use crate::domain::option::OptionId;

/// A structural mutation awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposedChange {
    /// Remove an option. Sub-options of a removed category are demoted to the
    /// top level, not removed.
    Remove {
        /// The option to remove.
        id: OptionId,
    },
    /// Move an option between the top level and a category.
    Reparent {
        /// The option to move.
        id: OptionId,
        /// The new parent. `None` moves the option to the top level.
        new_parent: Option<OptionId>,
    },
}

impl ProposedChange {
    /// The option the change applies to.
    #[must_use]
    pub const fn id(&self) -> &OptionId {
        match self {
            Self::Remove { id } | Self::Reparent { id, .. } => id,
        }
    }
}

impl fmt::Display for ProposedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remove { id } => write!(f, "remove {id}"),
            Self::Reparent {
                id,
                new_parent: Some(parent),
            } => write!(f, "move {id} under {parent}"),
            Self::Reparent {
                id,
                new_parent: None,
            } => write!(f, "move {id} to the top level"),
        }
    }
}

/// A proposed structural change, plus what is needed to revert any input that
/// was bound to it.
///
/// Obtained from [`Hierarchy::propose_removal`](crate::Hierarchy::propose_removal)
/// or [`Hierarchy::set_parent`](crate::Hierarchy::set_parent), and resolved by
/// passing it back to [`Hierarchy::commit`](crate::Hierarchy::commit) or
/// [`Hierarchy::cancel`](crate::Hierarchy::cancel).
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending change blocks further edits until it is committed or cancelled"]
pub struct PendingChange {
    pub(crate) ticket: u64,
    pub(crate) change: ProposedChange,
    pub(crate) previous_parent: Option<OptionId>,
}

impl PendingChange {
    /// The proposed mutation.
    #[must_use]
    pub const fn change(&self) -> &ProposedChange {
        &self.change
    }

    /// The parent the option had when the change was proposed.
    ///
    /// On cancellation, a UI restores any category picker bound to the
    /// option to this value.
    #[must_use]
    pub const fn previous_parent(&self) -> Option<&OptionId> {
        self.previous_parent.as_ref()
    }
}
