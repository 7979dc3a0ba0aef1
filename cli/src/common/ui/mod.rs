//! # tmns UI Utilities Module (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//!
//! ## Overview
//!
//! Interactive prompts. The executor asks for confirmation before cleaning a
//! build root that is also the working directory or the source checkout; it
//! does so through the [`Prompter`] trait so tests can answer the question
//! without a terminal.
//!
//! ## Usage
//!
//! ```rust
//! let prompter = TerminalPrompter;
//! if prompter.confirm("Delete ./build?")? {
//!     // ...
//! }
//! ```
//!
use crate::core::error::Result;
use anyhow::Context;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::IsTerminal;
use tracing::warn;

/// Asks the user yes/no questions.
pub trait Prompter {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// `dialoguer` prompt on the controlling terminal. Defaults to "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        // Without a terminal nobody can answer; treat it as a "no".
        if !std::io::stdin().is_terminal() {
            warn!("No terminal available to confirm: {}", question);
            return Ok(false);
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(false)
            .interact()
            .context("Failed to read confirmation from terminal")
    }
}

/// Prompter returning a fixed answer and remembering the questions asked.
#[cfg(test)]
pub struct ScriptedPrompter {
    pub answer: bool,
    pub asked: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: std::cell::RefCell::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        Ok(self.answer)
    }
}
