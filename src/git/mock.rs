//! git::mock
//!
//! In-memory Git configuration for deterministic testing.
//!
//! # Design
//!
//! Entries are kept per level in insertion order, which is what makes
//! multi-valued `credential.helper` behaviour observable in tests. Every
//! successful mutation is counted so tests can assert that an operation
//! was a no-op.
//!
//! # Example
//!
//! ```
//! use gcred::git::mock::MemoryConfig;
//! use gcred::git::{ConfigLevel, GitConfiguration};
//!
//! let config = MemoryConfig::new();
//! config.add(ConfigLevel::Global, "credential.helper", "").unwrap();
//! config.add(ConfigLevel::Global, "credential.helper", "/usr/bin/helper").unwrap();
//!
//! assert_eq!(
//!     config.get_all(ConfigLevel::Global, "credential.helper").unwrap(),
//!     vec!["", "/usr/bin/helper"]
//! );
//! assert_eq!(config.mutation_count(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use regex::Regex;

use super::config::{ConfigError, ConfigLevel, GitConfiguration};

/// Thread-safe in-memory configuration. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    inner: Arc<Mutex<MemoryConfigInner>>,
}

#[derive(Debug, Default)]
struct MemoryConfigInner {
    levels: BTreeMap<ConfigLevel, Vec<(String, String)>>,
    mutations: usize,
    read_only: bool,
    write_limit: Option<usize>,
}

/// Normalize `section.subsection.key`: section and key are case-insensitive.
fn normalize(name: &str) -> String {
    match (name.find('.'), name.rfind('.')) {
        (Some(first), Some(last)) if first != last => format!(
            "{}{}{}",
            name[..first].to_ascii_lowercase(),
            &name[first..last],
            name[last..].to_ascii_lowercase()
        ),
        _ => name.to_ascii_lowercase(),
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry without counting it as a mutation.
    pub fn seed(&self, level: ConfigLevel, name: &str, value: &str) {
        let mut inner = self.lock();
        inner
            .levels
            .entry(level)
            .or_default()
            .push((normalize(name), value.to_string()));
    }

    /// Make every write fail, as with a read-only config file.
    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    /// Let `n` more writes succeed, then fail every write after them.
    pub fn fail_writes_after(&self, n: usize) {
        let mut inner = self.lock();
        inner.write_limit = Some(inner.mutations + n);
    }

    /// Number of successful writes so far.
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryConfigInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn values(inner: &MemoryConfigInner, level: ConfigLevel, name: &str) -> Vec<String> {
        let key = normalize(name);
        let levels: Vec<ConfigLevel> = match level {
            ConfigLevel::All => vec![ConfigLevel::System, ConfigLevel::Global, ConfigLevel::Local],
            other => vec![other],
        };
        levels
            .iter()
            .filter_map(|l| inner.levels.get(l))
            .flat_map(|entries| entries.iter())
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn writable(&self, level: ConfigLevel) -> Result<std::sync::MutexGuard<'_, MemoryConfigInner>, ConfigError> {
        if level == ConfigLevel::All {
            return Err(ConfigError::WriteToAll);
        }
        let inner = self.lock();
        let exhausted = inner.write_limit.map_or(false, |limit| inner.mutations >= limit);
        if inner.read_only || exhausted {
            return Err(ConfigError::Internal {
                message: "could not lock config file: permission denied".to_string(),
            });
        }
        Ok(inner)
    }
}

impl GitConfiguration for MemoryConfig {
    fn get(&self, level: ConfigLevel, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(Self::values(&self.lock(), level, name).pop())
    }

    fn get_all(&self, level: ConfigLevel, name: &str) -> Result<Vec<String>, ConfigError> {
        Ok(Self::values(&self.lock(), level, name))
    }

    fn set(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut inner = self.writable(level)?;
        let key = normalize(name);
        let entries = inner.levels.entry(level).or_default();
        entries.retain(|(k, _)| *k != key);
        entries.push((key, value.to_string()));
        inner.mutations += 1;
        Ok(())
    }

    fn add(&self, level: ConfigLevel, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut inner = self.writable(level)?;
        inner
            .levels
            .entry(level)
            .or_default()
            .push((normalize(name), value.to_string()));
        inner.mutations += 1;
        Ok(())
    }

    fn unset_all(
        &self,
        level: ConfigLevel,
        name: &str,
        value_pattern: &str,
    ) -> Result<(), ConfigError> {
        let pattern = Regex::new(value_pattern)
            .map_err(|_| ConfigError::InvalidPattern(value_pattern.to_string()))?;
        let mut inner = self.writable(level)?;
        let key = normalize(name);
        let entries = inner.levels.entry(level).or_default();
        let before = entries.len();
        entries.retain(|(k, v)| !(*k == key && pattern.is_match(v)));
        if entries.len() != before {
            inner.mutations += 1;
        }
        Ok(())
    }
}
