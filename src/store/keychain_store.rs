//! store::keychain_store
//!
//! Credential storage in the OS keystore.
//!
//! # Platform Support
//!
//! This module uses the `keyring` crate which supports:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! # Feature Flag
//!
//! The Windows and macOS keystores are always built on those platforms.
//! The Linux Secret Service needs the `keychain` feature flag, which pulls
//! in D-Bus:
//!
//! ```toml
//! gcred = { version = "0.1", features = ["keychain"] }
//! ```
//!
//! # Layout
//!
//! Each credential is an entry with service `<namespace>:<service>` and the
//! account as user name. Keystores cannot be enumerated portably, so the
//! accounts of every service are also recorded in an index entry
//! (service `<namespace>:index`, user = service).

#[cfg(any(feature = "keychain", windows, target_os = "macos"))]
use keyring::Entry;

use super::traits::{CredentialStore, StoreError};
#[cfg(any(feature = "keychain", windows, target_os = "macos"))]
use super::traits::account_filter;
use crate::core::credential::Credential;

/// Which OS keystore the store was selected as. Only used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreKind {
    WindowsCredentialManager,
    MacOsKeychain,
    SecretService,
}

impl KeystoreKind {
    pub fn description(&self) -> &'static str {
        match self {
            KeystoreKind::WindowsCredentialManager => "Windows Credential Manager",
            KeystoreKind::MacOsKeychain => "macOS keychain",
            KeystoreKind::SecretService => "freedesktop Secret Service",
        }
    }
}

/// Whether keystore support was compiled in.
pub fn keystore_enabled() -> bool {
    cfg!(any(feature = "keychain", windows, target_os = "macos"))
}

/// OS keystore credential storage.
#[derive(Debug)]
pub struct KeychainCredentialStore {
    namespace: String,
    kind: KeystoreKind,
}

impl KeychainCredentialStore {
    /// Create a keystore-backed store.
    ///
    /// Fails when compiled without the `keychain` feature.
    pub fn new(namespace: &str, kind: KeystoreKind) -> Result<Self, StoreError> {
        if !keystore_enabled() {
            return Err(StoreError::Unavailable(format!(
                "{} support is not enabled in this build (compile with --features keychain)",
                kind.description()
            )));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            kind,
        })
    }

    /// Keystore service name for a credential service.
    pub fn service_name(&self, service: &str) -> String {
        if self.namespace.is_empty() {
            service.to_string()
        } else {
            format!("{}:{}", self.namespace, service)
        }
    }

    fn index_name(&self) -> String {
        if self.namespace.is_empty() {
            "index".to_string()
        } else {
            format!("{}:index", self.namespace)
        }
    }
}

#[cfg(any(feature = "keychain", windows, target_os = "macos"))]
impl KeychainCredentialStore {
    fn entry(&self, service: &str, account: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name(service), account)
            .map_err(|e| StoreError::ReadError(format!("cannot create keyring entry: {}", e)))
    }

    fn index_entry(&self, service: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.index_name(), service)
            .map_err(|e| StoreError::ReadError(format!("cannot create keyring entry: {}", e)))
    }

    fn read_password(&self, entry: &Entry) -> Result<Option<String>, StoreError> {
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(StoreError::ReadError(format!(
                "ambiguous entry in {}",
                self.kind.description()
            ))),
            Err(keyring::Error::NoStorageAccess(e)) => Err(StoreError::PermissionDenied(format!(
                "cannot access {}: {}",
                self.kind.description(),
                e
            ))),
            Err(e) => Err(StoreError::ReadError(format!(
                "cannot read from {}: {}",
                self.kind.description(),
                e
            ))),
        }
    }

    fn indexed_accounts(&self, service: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.read_password(&self.index_entry(service)?)?
            .map(|list| {
                list.lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn write_index(&self, service: &str, accounts: &[String]) -> Result<(), StoreError> {
        let entry = self.index_entry(service)?;
        if accounts.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(StoreError::DeleteError(format!(
                    "cannot update keychain index: {}",
                    e
                ))),
            };
        }
        entry
            .set_password(&accounts.join("\n"))
            .map_err(|e| StoreError::WriteError(format!("cannot update keychain index: {}", e)))
    }
}

#[cfg(any(feature = "keychain", windows, target_os = "macos"))]
impl CredentialStore for KeychainCredentialStore {
    fn get_accounts(&self, service: &str) -> Result<Vec<String>, StoreError> {
        let mut accounts = Vec::new();
        for account in self.indexed_accounts(service)? {
            // Entries deleted behind our back drop out of the listing
            if self.read_password(&self.entry(service, &account)?)?.is_some()
                && !accounts.contains(&account)
            {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>, StoreError> {
        let candidates = match account_filter(account) {
            Some(account) => vec![account.to_string()],
            None => self.indexed_accounts(service)?,
        };

        for account in candidates {
            if let Some(password) = self.read_password(&self.entry(service, &account)?)? {
                return Ok(Some(Credential::new(account, password)));
            }
        }
        Ok(None)
    }

    fn add_or_update(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        let entry = self.entry(service, account)?;
        let unchanged = self.read_password(&entry)?.as_deref() == Some(secret);

        if !unchanged {
            entry
                .set_password(secret)
                .map_err(|e| {
                    StoreError::WriteError(format!(
                        "cannot write to {}: {}",
                        self.kind.description(),
                        e
                    ))
                })?;
        }

        let mut accounts = self.indexed_accounts(service)?;
        if !accounts.iter().any(|a| a == account) {
            accounts.push(account.to_string());
            self.write_index(service, &accounts)?;
        }
        Ok(())
    }

    fn remove(&self, service: &str, account: Option<&str>) -> Result<bool, StoreError> {
        let Some(credential) = self.get(service, account)? else {
            return Ok(false);
        };

        let removed = match self.entry(service, credential.account())?.delete_credential() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false,
            Err(e) => {
                return Err(StoreError::DeleteError(format!(
                    "cannot delete from {}: {}",
                    self.kind.description(),
                    e
                )))
            }
        };

        let mut accounts = self.indexed_accounts(service)?;
        accounts.retain(|a| a != credential.account());
        self.write_index(service, &accounts)?;
        Ok(removed)
    }
}

// Stub implementation when keychain feature is disabled
#[cfg(not(any(feature = "keychain", windows, target_os = "macos")))]
impl KeychainCredentialStore {
    fn not_available(&self) -> String {
        format!("{} not available", self.kind.description())
    }
}

#[cfg(not(any(feature = "keychain", windows, target_os = "macos")))]
impl CredentialStore for KeychainCredentialStore {
    fn get_accounts(&self, _service: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::ReadError(self.not_available()))
    }

    fn get(&self, _service: &str, _account: Option<&str>) -> Result<Option<Credential>, StoreError> {
        Err(StoreError::ReadError(self.not_available()))
    }

    fn add_or_update(&self, _service: &str, _account: &str, _secret: &str) -> Result<(), StoreError> {
        Err(StoreError::WriteError(self.not_available()))
    }

    fn remove(&self, _service: &str, _account: Option<&str>) -> Result<bool, StoreError> {
        Err(StoreError::DeleteError(self.not_available()))
    }
}
