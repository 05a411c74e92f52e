//! git
//!
//! Single interface for all Git configuration access.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Settings lookups, provider
//! memoization and helper installation all flow through the
//! [`GitConfiguration`] trait. No other module should import `git2`.
//!
//! # Responsibilities
//!
//! - Reading merged and per-level configuration values
//! - Order-preserving multi-valued entries (`credential.helper`)
//! - Installing/removing this program as a credential helper
//!
//! # Example
//!
//! ```no_run
//! use gcred::git::{ConfigLevel, Git2Configuration, GitConfiguration};
//! use std::path::Path;
//!
//! let git = Git2Configuration::discover(Path::new("."));
//! let helpers = git.get_all(ConfigLevel::All, "credential.helper")?;
//! # Ok::<(), gcred::git::ConfigError>(())
//! ```

mod config;
pub mod helper;
pub mod mock;

pub use config::{escape_value_pattern, ConfigError, ConfigLevel, Git2Configuration, GitConfiguration};
