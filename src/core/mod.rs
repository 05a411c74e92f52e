//! core
//!
//! Core domain types and process-wide state for gcred.
//!
//! # Modules
//!
//! - [`credential`] - The credential model
//! - [`input`] - Git credential protocol input/output
//! - [`environment`] - Environment snapshot and platform facts
//! - [`settings`] - Layered environment + Git config settings
//! - [`context`] - Per-invocation command context
//!
//! # Design Principles
//!
//! - Nothing here reads process state directly; the CLI captures it once
//! - Secrets never appear in `Debug` output

pub mod context;
pub mod credential;
pub mod environment;
pub mod input;
pub mod settings;
