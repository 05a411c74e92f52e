//! cli
//!
//! Command-line interface layer for gcred.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialise logging
//! - Capture process state once into a [`CommandContext`]
//! - Delegate to command handlers

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::core::context::CommandContext;
use crate::core::environment::{Environment, Platform};
use crate::git::Git2Configuration;

/// Environment variable holding the `env_logger` filter.
pub const LOG_ENV: &str = "GCRED_LOG";

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, default_filter))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let env = Environment::from_process();
    let cwd = match cli.cwd {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let git = Arc::new(Git2Configuration::discover(&cwd));
    let platform = Platform::detect(&env);
    let program_path = std::env::current_exe()
        .context("cannot determine helper executable path")?
        .to_string_lossy()
        .into_owned();
    log::debug!("running on {:?} as {}", platform, program_path);

    let ctx = Arc::new(CommandContext::new(env, git, platform, program_path));
    commands::dispatch(cli.command, ctx)
}
