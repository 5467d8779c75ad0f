//! Interactive questions asked by commands.

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Password};

pub trait Prompt {
    /// Reads a secret without echo.
    fn password(&self, label: &str) -> Result<String>;
    /// Yes/no question defaulting to no.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn password(&self, label: &str) -> Result<String> {
        Ok(Password::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()?)
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        Ok(Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(false)
            .interact()?)
    }
}
