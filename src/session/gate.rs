use std::fmt;

use crate::domain::OptionType;

/// A question put to the operator before a destructive edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Remove an option.
    RemoveOption {
        /// Label of the option to remove.
        label: String,
        /// The catalogue being edited.
        option_type: OptionType,
    },
    /// Move an option between the top level and a category.
    ChangeCategoryLevel {
        /// Label of the option to move.
        label: String,
        /// The catalogue being edited.
        option_type: OptionType,
    },
    /// Throw away unsaved changes.
    DiscardChanges,
}

impl Prompt {
    /// A short title for the prompt.
    #[must_use]
    pub const fn header(&self) -> &'static str {
        match self {
            Self::RemoveOption { .. } => "Remove option?",
            Self::ChangeCategoryLevel { .. } => "Change category level?",
            Self::DiscardChanges => "Discard changes?",
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveOption { label, option_type } => write!(
                f,
                "Really remove '{label}'? Removing or changing categories can leave {} \
                 assigned incorrectly.",
                option_type.noun()
            ),
            Self::ChangeCategoryLevel { label, option_type } => write!(
                f,
                "Moving '{label}' between the top level and a category can leave {} \
                 assigned incorrectly.",
                option_type.noun()
            ),
            Self::DiscardChanges => f.write_str("Unsaved changes will be lost."),
        }
    }
}

/// The operator's answer to a [`Prompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Go ahead.
    Accepted,
    /// Leave everything as it was.
    Rejected,
}

impl From<bool> for Decision {
    fn from(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }
}

/// Asks the operator to confirm a destructive edit.
///
/// Each call resolves exactly once. An implementation that cannot reach the
/// operator answers [`Decision::Rejected`].
pub trait ConfirmationGate {
    /// Puts `prompt` to the operator.
    fn confirm(&mut self, prompt: &Prompt) -> Decision;
}

impl<F> ConfirmationGate for F
where
    F: FnMut(&Prompt) -> Decision,
{
    fn confirm(&mut self, prompt: &Prompt) -> Decision {
        self(prompt)
    }
}
