//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--cwd <path>`: Read repository config as if started in that directory

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gcred - Git credential helper with host provider auto-detection
#[derive(Parser, Debug)]
#[command(name = "git-credential-gcred")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read repository configuration as if started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging (to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Return a stored or new credential (called by Git)
    #[command(
        name = "get",
        long_about = "Return a credential for the request on standard input.\n\n\
            Git writes the request as key=value lines. The matching host provider is \
            found, a stored credential is returned if there is one, and otherwise a new \
            one is generated (usually by prompting)."
    )]
    Get,

    /// Store a credential that worked (called by Git)
    #[command(name = "store")]
    Store,

    /// Erase a credential that was rejected (called by Git)
    #[command(name = "erase")]
    Erase,

    /// Register gcred as the Git credential helper
    #[command(
        name = "configure",
        long_about = "Register gcred as the credential helper in Git configuration.\n\n\
            Adds an empty credential.helper entry (which clears helpers configured at \
            lower levels) followed by this program. Running it again changes nothing.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Configure for the current user
    git-credential-gcred configure

    # Configure for every user on this machine
    sudo git-credential-gcred configure --system"
    )]
    Configure {
        /// Change system configuration instead of the user's global configuration
        #[arg(long)]
        system: bool,
    },

    /// Remove gcred as the Git credential helper
    #[command(name = "unconfigure")]
    Unconfigure {
        /// Change system configuration instead of the user's global configuration
        #[arg(long)]
        system: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    git-credential-gcred completion bash > /etc/bash_completion.d/git-credential-gcred

    # Zsh
    git-credential-gcred completion zsh > \"${fpath[1]}/_git-credential-gcred\""
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
