use catalogue::{ConfirmationGate, Decision, Prompt};
use dialoguer::Confirm;

use super::terminal::Colorize;

/// Asks for confirmation on the terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalGate {
    assume_yes: bool,
}

impl TerminalGate {
    /// With `assume_yes`, every prompt is accepted without asking.
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl ConfirmationGate for TerminalGate {
    fn confirm(&mut self, prompt: &Prompt) -> Decision {
        if self.assume_yes {
            tracing::debug!("Accepting '{}' without asking", prompt.header());
            return Decision::Accepted;
        }

        println!("{}", prompt.header().warning());
        match Confirm::new()
            .with_prompt(prompt.to_string())
            .default(false)
            .interact()
        {
            Ok(accepted) => accepted.into(),
            Err(e) => {
                tracing::warn!("Could not read confirmation: {e}");
                Decision::Rejected
            }
        }
    }
}
