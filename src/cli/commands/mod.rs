//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each handler receives the shared [`CommandContext`]. The protocol
//! actions (`get`, `store`, `erase`) are async because host provider
//! detection may probe the remote over HTTP; they run on a runtime
//! created for the duration of the call.

mod completion;
mod configure;
mod credential;

pub use completion::{completion, write_completion};
pub use configure::{configure, unconfigure};
pub use credential::{build_registry, execute, Action};

use std::sync::Arc;

use crate::cli::args::Command;
use crate::core::context::CommandContext;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: Arc<CommandContext>) -> Result<()> {
    match command {
        Command::Get => credential::run(&ctx, Action::Get),
        Command::Store => credential::run(&ctx, Action::Store),
        Command::Erase => credential::run(&ctx, Action::Erase),
        Command::Configure { system } => configure::configure(&ctx, system),
        Command::Unconfigure { system } => configure::unconfigure(&ctx, system),
        Command::Completion { shell } => completion::completion(shell),
    }
}
