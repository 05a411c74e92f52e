//! gcred - A Git credential helper
//!
//! gcred answers Git's credential protocol (`get`, `store`, `erase`). For
//! each request it picks a host provider, which decides how credentials
//! for that remote are produced, and a credential store, which decides
//! where they are kept.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, dispatches)
//! - [`core`] - Credential model, protocol input, settings and context
//! - [`providers`] - Host providers and the provider registry
//! - [`store`] - Credential store backends and the store selector
//! - [`git`] - Single interface for Git configuration access
//! - [`ui`] - Terminal prompts
//!
//! # Invariants
//!
//! 1. Secrets never appear in logs or `Debug` output
//! 2. The backing store is selected at most once per process
//! 3. At most one HTTP probe is sent per request

pub mod cli;
pub mod core;
pub mod git;
pub mod providers;
pub mod store;
pub mod ui;
