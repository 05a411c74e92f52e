//! ui::prompts
//!
//! Terminal prompts for credentials.
//!
//! # Design
//!
//! Standard input and output carry the Git credential protocol, so prompts
//! talk to the controlling terminal directly (`/dev/tty`, or `CONIN$` and
//! `CONOUT$` on Windows). Prompts are only shown in interactive mode. In
//! non-interactive mode every prompt fails with
//! [`PromptError::NotInteractive`].

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("cannot prompt because user interactivity has been disabled")]
    NotInteractive,

    #[error("cannot prompt: no terminal available ({0})")]
    NoTerminal(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    /// Prompt for visible text input.
    fn input(&self, message: &str) -> Result<String, PromptError>;

    /// Prompt for masked input (e.g., passwords, tokens).
    fn password(&self, message: &str) -> Result<String, PromptError>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    fn ensure_interactive(&self) -> Result<(), PromptError> {
        if self.interactive {
            Ok(())
        } else {
            Err(PromptError::NotInteractive)
        }
    }
}

#[cfg(windows)]
const TTY_IN: &str = "CONIN$";
#[cfg(windows)]
const TTY_OUT: &str = "CONOUT$";
#[cfg(not(windows))]
const TTY_IN: &str = "/dev/tty";
#[cfg(not(windows))]
const TTY_OUT: &str = "/dev/tty";

fn open_terminal() -> Result<(File, File), PromptError> {
    let input = File::open(TTY_IN).map_err(|e| PromptError::NoTerminal(e.to_string()))?;
    let output = OpenOptions::new()
        .write(true)
        .open(TTY_OUT)
        .map_err(|e| PromptError::NoTerminal(e.to_string()))?;
    Ok((input, output))
}

impl Prompter for TerminalPrompter {
    fn input(&self, message: &str) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        let (input, mut output) = open_terminal()?;

        write!(output, "{}", message)
            .and_then(|_| output.flush())
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        let mut line = String::new();
        let read = BufReader::new(input)
            .read_line(&mut line)
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        if read == 0 {
            return Err(PromptError::Cancelled);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn password(&self, message: &str) -> Result<String, PromptError> {
        self.ensure_interactive()?;
        rpassword::prompt_password(message).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => PromptError::Cancelled,
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                PromptError::NoTerminal(e.to_string())
            }
            _ => PromptError::IoError(e.to_string()),
        })
    }
}

/// Prompter that replays canned answers, for tests.
///
/// Every prompt message is recorded; prompting with no answers left is
/// treated as the user cancelling.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Messages prompted so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    fn next(&self, message: &str) -> Result<String, PromptError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        self.answers
            .lock()
            .map_err(|_| PromptError::IoError("prompter poisoned".into()))?
            .pop_front()
            .ok_or(PromptError::Cancelled)
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, message: &str) -> Result<String, PromptError> {
        self.next(message)
    }

    fn password(&self, message: &str) -> Result<String, PromptError> {
        self.next(message)
    }
}
