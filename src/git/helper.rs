//! git::helper
//!
//! Installing and removing this program as a Git credential helper.
//!
//! # Invariant
//!
//! After [`configure`], the `credential.helper` list at the target level
//! ends with exactly one empty entry followed by exactly one entry naming
//! this program, and no empty entry follows that pair. The empty entry
//! resets any helpers Git collected from lower-priority levels.
//!
//! ```text
//! [credential]
//!     helper = cache        # pre-existing entries are left alone
//!     helper =
//!     helper = /usr/local/bin/git-credential-gcred
//! ```
//!
//! # Design
//!
//! Both operations first compute a plan from a snapshot of the list and
//! only then touch configuration, so a second `configure` is a true no-op.

use super::config::{escape_value_pattern, ConfigError, ConfigLevel, GitConfiguration};

/// Name of the multi-valued helper entry.
pub const HELPER_KEY: &str = "credential.helper";

/// What `configure` needs to do for a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurePlan {
    /// The list already satisfies the invariant.
    AlreadyConfigured,
    /// Remove existing entries for this program, then append `""` and it.
    Install,
}

/// What `unconfigure` needs to do for a given snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnconfigurePlan {
    /// This program is not in the list.
    NotConfigured,
    /// Remove this program's entry (`value` as stored).
    Remove {
        value: String,
        /// The blank entry right before it must go as well.
        remove_preceding_blank: bool,
    },
}

/// Escape a program path for use as a helper value.
///
/// Git runs helper values through the shell, so spaces and parentheses are
/// backslash-escaped. Windows paths use forward slashes.
pub fn escape_helper_path(path: &str) -> String {
    let normalized = if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_string()
    };

    let mut out = String::with_capacity(normalized.len() + 8);
    for c in normalized.chars() {
        if matches!(c, ' ' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape_helper_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some(' ' | '(' | ')')) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Compare a helper value to a program path as paths, not strings.
pub fn is_same_path(helper_value: &str, program_path: &str) -> bool {
    let normalize = |s: &str| {
        let s = unescape_helper_value(s).replace('\\', "/");
        let s = s.trim_end_matches('/').to_string();
        if cfg!(windows) {
            s.to_lowercase()
        } else {
            s
        }
    };
    let value = helper_value.trim();
    !value.is_empty() && normalize(value) == normalize(program_path)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Decide whether `configure` has work to do.
pub fn plan_configure(entries: &[String], program_path: &str) -> ConfigurePlan {
    let matches: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, v)| is_same_path(v, program_path))
        .map(|(i, _)| i)
        .collect();

    let satisfied = match matches.as_slice() {
        [index] => {
            let index = *index;
            index > 0
                && is_blank(&entries[index - 1])
                && !entries[index + 1..].iter().any(|v| is_blank(v))
        }
        _ => false,
    };

    if satisfied {
        ConfigurePlan::AlreadyConfigured
    } else {
        ConfigurePlan::Install
    }
}

/// Decide what `unconfigure` has to remove.
pub fn plan_unconfigure(entries: &[String], program_path: &str) -> UnconfigurePlan {
    match entries.iter().position(|v| is_same_path(v, program_path)) {
        None => UnconfigurePlan::NotConfigured,
        Some(index) => UnconfigurePlan::Remove {
            value: entries[index].clone(),
            remove_preceding_blank: index == entries.len() - 1
                && index > 0
                && is_blank(&entries[index - 1]),
        },
    }
}

fn exact_pattern(value: &str) -> String {
    format!("^{}$", escape_value_pattern(value))
}

/// Register `program_path` as the credential helper at `level`.
///
/// Returns `true` when configuration was changed.
pub fn configure(
    git: &dyn GitConfiguration,
    level: ConfigLevel,
    program_path: &str,
) -> Result<bool, ConfigError> {
    let entries = git.get_all(level, HELPER_KEY)?;
    let escaped = escape_helper_path(program_path);

    match plan_configure(&entries, program_path) {
        ConfigurePlan::AlreadyConfigured => {
            log::debug!("credential helper already configured at {} level", level);
            Ok(false)
        }
        ConfigurePlan::Install => {
            log::debug!("installing credential helper at {} level", level);
            // Entries may have been written unescaped or with other separators
            let mut stale: Vec<&String> = entries
                .iter()
                .filter(|v| is_same_path(v, program_path))
                .collect();
            stale.dedup();
            for value in stale {
                git.unset_all(level, HELPER_KEY, &exact_pattern(value))?;
            }
            git.unset_all(level, HELPER_KEY, &exact_pattern(&escaped))?;
            git.add(level, HELPER_KEY, "")?;
            git.add(level, HELPER_KEY, &escaped)?;
            Ok(true)
        }
    }
}

/// Remove `program_path` as a credential helper at `level`.
///
/// Returns `true` when configuration was changed.
pub fn unconfigure(
    git: &dyn GitConfiguration,
    level: ConfigLevel,
    program_path: &str,
) -> Result<bool, ConfigError> {
    let entries = git.get_all(level, HELPER_KEY)?;

    match plan_unconfigure(&entries, program_path) {
        UnconfigurePlan::NotConfigured => {
            log::debug!("credential helper not configured at {} level", level);
            Ok(false)
        }
        UnconfigurePlan::Remove {
            value,
            remove_preceding_blank,
        } => {
            if remove_preceding_blank {
                remove_blank_before_last(git, level, &entries)?;
            }
            git.unset_all(level, HELPER_KEY, &exact_pattern(&value))?;
            Ok(true)
        }
    }
}

/// Remove the blank entry just before the last entry.
///
/// Git can only remove values by pattern, so when other blank entries
/// exist the list is rewritten without that single entry.
fn remove_blank_before_last(
    git: &dyn GitConfiguration,
    level: ConfigLevel,
    entries: &[String],
) -> Result<(), ConfigError> {
    let blank_count = entries.iter().filter(|v| is_blank(v)).count();
    if blank_count == 1 {
        return git.unset_all(level, HELPER_KEY, "^[[:space:]]*$");
    }

    let target = entries.len() - 2;
    log::debug!("rewriting {} at {} level: {:?}", HELPER_KEY, level, entries);
    git.unset_all(level, HELPER_KEY, ".*")?;
    for (i, value) in entries.iter().enumerate() {
        if i == target {
            continue;
        }
        if let Err(err) = git.add(level, HELPER_KEY, value) {
            let restore = restore_commands(level, entries);
            log::warn!(
                "{} at {} level was cleared but not rewritten; original entries:\n{}",
                HELPER_KEY,
                level,
                restore
            );
            return Err(ConfigError::Rewrite {
                key: HELPER_KEY.to_string(),
                level,
                message: err.to_string(),
                restore,
            });
        }
    }
    Ok(())
}

/// Shell commands that recreate `entries` at `level`.
fn restore_commands(level: ConfigLevel, entries: &[String]) -> String {
    entries
        .iter()
        .map(|v| {
            format!(
                "git config --{} --add {} '{}'",
                level,
                HELPER_KEY,
                v.replace('\'', "'\\''")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
