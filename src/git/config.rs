//! git::config
//!
//! Git configuration access using git2.
//!
//! This module is the **single doorway** to Git configuration. Settings
//! lookups, provider memoization and helper installation all go through the
//! [`GitConfiguration`] trait, so nothing else imports `git2`.
//!
//! # Levels
//!
//! Reads at [`ConfigLevel::All`] see the merged view (local over global over
//! system). Writes must name a concrete level.
//!
//! # Multi-valued Entries
//!
//! `credential.helper` is multi-valued and order-sensitive. [`add`] always
//! appends a new entry, and [`unset_all`] removes every entry whose value
//! matches a (POSIX extended) regular expression.
//!
//! [`add`]: GitConfiguration::add
//! [`unset_all`]: GitConfiguration::unset_all

use std::path::{Path, PathBuf};

use git2::{Config, ErrorCode, Repository};
use thiserror::Error;

/// Errors from Git configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested level has no backing file.
    #[error("no {0} git configuration available")]
    LevelUnavailable(ConfigLevel),

    /// Writes require a concrete level.
    #[error("cannot write to the merged git configuration; choose a level")]
    WriteToAll,

    /// Invalid value regular expression.
    #[error("invalid value pattern '{0}'")]
    InvalidPattern(String),

    /// A multi-valued key was cleared but not fully rewritten.
    #[error(
        "failed to rewrite {key} at {level} level: {message}\n\
         restore the original entries with:\n{restore}"
    )]
    Rewrite {
        key: String,
        level: ConfigLevel,
        message: String,
        /// `git config` commands that recreate the original list
        restore: String,
    },

    /// Internal git2 error.
    #[error("git config error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for ConfigError {
    fn from(e: git2::Error) -> Self {
        ConfigError::Internal {
            message: e.message().to_string(),
        }
    }
}

/// Git configuration level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigLevel {
    /// Merged view of every level (reads only).
    All,
    System,
    Global,
    Local,
}

impl std::fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLevel::All => write!(f, "merged"),
            ConfigLevel::System => write!(f, "system"),
            ConfigLevel::Global => write!(f, "global"),
            ConfigLevel::Local => write!(f, "local"),
        }
    }
}

/// Key/value access to Git configuration.
///
/// Names use Git's `section[.subsection].key` form; the section and key are
/// case-insensitive, the subsection is not.
pub trait GitConfiguration: Send + Sync {
    /// Get the effective value of a single-valued entry.
    fn get(&self, level: ConfigLevel, name: &str) -> Result<Option<String>, ConfigError>;

    /// Get every value of a (possibly multi-valued) entry, in file order.
    fn get_all(&self, level: ConfigLevel, name: &str) -> Result<Vec<String>, ConfigError>;

    /// Set a single-valued entry, replacing any existing value.
    fn set(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError>;

    /// Append a new value to a multi-valued entry.
    fn add(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError>;

    /// Remove every value matching `value_pattern`. Missing entries are not
    /// an error.
    fn unset_all(
        &self,
        level: ConfigLevel,
        name: &str,
        value_pattern: &str,
    ) -> Result<(), ConfigError>;
}

/// A value pattern that never matches, used to force `set_multivar` to
/// append instead of replace.
const NEVER_MATCHES: &str = "a^";

/// git2-backed configuration for the current directory.
#[derive(Debug, Clone)]
pub struct Git2Configuration {
    /// Repository to include local config from, if any.
    repo_path: Option<PathBuf>,
}

impl Git2Configuration {
    /// Discover the repository containing `cwd` (if any).
    pub fn discover(cwd: &Path) -> Self {
        let repo_path = Repository::discover(cwd)
            .ok()
            .map(|repo| repo.path().to_path_buf());
        Self { repo_path }
    }

    /// Configuration without any repository-local level.
    pub fn without_repository() -> Self {
        Self { repo_path: None }
    }

    fn open(&self, level: ConfigLevel) -> Result<Config, ConfigError> {
        match level {
            ConfigLevel::All => match &self.repo_path {
                Some(path) => Ok(Repository::open(path)?.config()?),
                None => Ok(Config::open_default()?),
            },
            ConfigLevel::System => {
                let path = Config::find_system()
                    .map_err(|_| ConfigError::LevelUnavailable(ConfigLevel::System))?;
                Ok(Config::open(&path)?)
            }
            ConfigLevel::Global => {
                let path = match Config::find_global() {
                    Ok(path) => path,
                    // libgit2 only finds existing files; Git creates ~/.gitconfig on write
                    Err(_) => dirs::home_dir()
                        .map(|h| h.join(".gitconfig"))
                        .ok_or(ConfigError::LevelUnavailable(ConfigLevel::Global))?,
                };
                Ok(Config::open(&path)?)
            }
            ConfigLevel::Local => {
                let path = self
                    .repo_path
                    .as_ref()
                    .ok_or(ConfigError::LevelUnavailable(ConfigLevel::Local))?;
                Ok(Config::open(&path.join("config"))?)
            }
        }
    }

    fn open_writable(&self, level: ConfigLevel) -> Result<Config, ConfigError> {
        if level == ConfigLevel::All {
            return Err(ConfigError::WriteToAll);
        }
        self.open(level)
    }
}

fn not_found_as_none<T>(result: Result<T, git2::Error>) -> Result<Option<T>, ConfigError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl GitConfiguration for Git2Configuration {
    fn get(&self, level: ConfigLevel, name: &str) -> Result<Option<String>, ConfigError> {
        let config = match self.open(level) {
            Ok(c) => c,
            Err(ConfigError::LevelUnavailable(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        not_found_as_none(config.get_string(name))
    }

    fn get_all(&self, level: ConfigLevel, name: &str) -> Result<Vec<String>, ConfigError> {
        let config = match self.open(level) {
            Ok(c) => c,
            Err(ConfigError::LevelUnavailable(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let entries = match not_found_as_none(config.multivar(name, None))? {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        let mut values = Vec::new();
        entries.for_each(|entry| {
            // A bare `helper` line (no `=`) has no value; Git treats it as empty
            values.push(entry.value().unwrap_or_default().to_string());
        })?;
        Ok(values)
    }

    fn set(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.open_writable(level)?;
        config.set_str(name, value)?;
        Ok(())
    }

    fn add(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.open_writable(level)?;
        config.set_multivar(name, NEVER_MATCHES, value)?;
        Ok(())
    }

    fn unset_all(
        &self,
        level: ConfigLevel,
        name: &str,
        value_pattern: &str,
    ) -> Result<(), ConfigError> {
        let mut config = self.open_writable(level)?;
        match config.remove_multivar(name, value_pattern) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) if e.class() == git2::ErrorClass::Regex => {
                Err(ConfigError::InvalidPattern(value_pattern.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Escape a literal string for use in a POSIX extended regular expression.
pub fn escape_value_pattern(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() * 2);
    for c in literal.chars() {
        if matches!(
            c,
            '.' | '[' | ']' | '(' | ')' | '*' | '+' | '?' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git2Configuration) {
        let dir = TempDir::new().expect("temp dir");
        Repository::init(dir.path()).expect("init");
        let config = Git2Configuration::discover(dir.path());
        (dir, config)
    }

    #[test]
    fn escape_value_pattern_escapes_metacharacters() {
        assert_eq!(escape_value_pattern("a.b"), "a\\.b");
        assert_eq!(
            escape_value_pattern("/opt/app\\ (x86)/bin"),
            "/opt/app\\\\ \\(x86\\)/bin"
        );
        assert_eq!(escape_value_pattern("plain"), "plain");
    }

    #[test]
    fn local_set_and_get() {
        let (_dir, config) = init_repo();

        config
            .set(ConfigLevel::Local, "credential.provider", "generic")
            .expect("set");

        assert_eq!(
            config.get(ConfigLevel::Local, "credential.provider").expect("get"),
            Some("generic".to_string())
        );
        assert_eq!(
            config.get(ConfigLevel::Local, "credential.missing").expect("get"),
            None
        );
    }

    #[test]
    fn local_multivar_add_preserves_order_and_blanks() {
        let (_dir, config) = init_repo();

        config.add(ConfigLevel::Local, "credential.helper", "first").expect("add");
        config.add(ConfigLevel::Local, "credential.helper", "").expect("add");
        config.add(ConfigLevel::Local, "credential.helper", "second").expect("add");

        assert_eq!(
            config.get_all(ConfigLevel::Local, "credential.helper").expect("get_all"),
            vec!["first", "", "second"]
        );
    }

    #[test]
    fn local_unset_all_by_pattern() {
        let (_dir, config) = init_repo();

        config.add(ConfigLevel::Local, "credential.helper", "keep").expect("add");
        config.add(ConfigLevel::Local, "credential.helper", "drop").expect("add");
        config.add(ConfigLevel::Local, "credential.helper", "drop").expect("add");

        config
            .unset_all(ConfigLevel::Local, "credential.helper", "^drop$")
            .expect("unset");

        assert_eq!(
            config.get_all(ConfigLevel::Local, "credential.helper").expect("get_all"),
            vec!["keep"]
        );

        // Nothing left to match is fine
        config
            .unset_all(ConfigLevel::Local, "credential.helper", "^drop$")
            .expect("unset again");
    }

    #[test]
    fn write_to_merged_view_rejected() {
        let (_dir, config) = init_repo();
        let result = config.set(ConfigLevel::All, "credential.provider", "x");
        assert!(matches!(result, Err(ConfigError::WriteToAll)));
    }

    #[test]
    fn local_level_unavailable_outside_repo() {
        let config = Git2Configuration::without_repository();
        let result = config.set(ConfigLevel::Local, "credential.provider", "x");
        assert!(matches!(
            result,
            Err(ConfigError::LevelUnavailable(ConfigLevel::Local))
        ));
        assert_eq!(config.get(ConfigLevel::Local, "credential.provider").expect("get"), None);
    }
}
