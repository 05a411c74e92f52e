//! configure / unconfigure commands - Install or remove the helper entry

use anyhow::{Context as _, Result};

use crate::core::context::CommandContext;
use crate::git::{helper, ConfigLevel};

fn target_level(system: bool) -> ConfigLevel {
    if system {
        ConfigLevel::System
    } else {
        ConfigLevel::Global
    }
}

/// Register this program as `credential.helper`.
pub fn configure(ctx: &CommandContext, system: bool) -> Result<()> {
    let level = target_level(system);
    let changed = helper::configure(ctx.git(), level, &ctx.program_path)
        .with_context(|| format!("failed to configure credential helper in {} config", level))?;

    if changed {
        eprintln!("Configured credential helper in {} Git configuration.", level);
    } else {
        eprintln!("Credential helper is already configured in {} Git configuration.", level);
    }
    Ok(())
}

/// Remove this program from `credential.helper`.
pub fn unconfigure(ctx: &CommandContext, system: bool) -> Result<()> {
    let level = target_level(system);
    let changed = helper::unconfigure(ctx.git(), level, &ctx.program_path)
        .with_context(|| format!("failed to unconfigure credential helper in {} config", level))?;

    if changed {
        eprintln!("Removed credential helper from {} Git configuration.", level);
    } else {
        log::debug!("nothing to remove from {} configuration", level);
    }
    Ok(())
}
