//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Terminal prompts for usernames, passwords and tokens
//!
//! # Design
//!
//! Prompts are reached through the [`prompts::Prompter`] trait so providers
//! never touch the terminal directly and tests can script answers.

pub mod prompts;
