//! store::traits
//!
//! Credential store trait definition.
//!
//! # Design
//!
//! Every backend (OS keystore, DPAPI files, GPG/pass, plaintext files, Git's
//! credential cache) implements [`CredentialStore`]. Entries are addressed
//! by a *service* (the remote URL, e.g. `https://example.com/org`) and an
//! *account* (the username).
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secrets in error messages
//! - Use secure storage mechanisms appropriate to the platform
//! - Be thread-safe (Send + Sync)
//!
//! # Example
//!
//! ```ignore
//! use gcred::store::{CredentialStore, StoreError};
//!
//! fn lookup(store: &dyn CredentialStore) -> Result<(), StoreError> {
//!     if let Some(cred) = store.get("https://example.com", Some("alice"))? {
//!         // Use cred.password() (never print it!)
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::core::credential::Credential;

/// Errors from credential storage operations.
///
/// Note: Error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read from credential storage.
    #[error("failed to read credential: {0}")]
    ReadError(String),

    /// Failed to write to credential storage.
    #[error("failed to write credential: {0}")]
    WriteError(String),

    /// Failed to delete from credential storage.
    #[error("failed to delete credential: {0}")]
    DeleteError(String),

    /// Permission denied accessing credential storage.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The configured store cannot be used in this environment.
    ///
    /// The message is complete and user-facing, including where to find help.
    #[error("{0}")]
    Unavailable(String),
}

/// Trait for credential storage backends.
///
/// Implementations must be thread-safe (Send + Sync) and must never
/// log, print, or include secret values in error messages.
///
/// # Accounts
///
/// Passing `None` (or an empty string) as the account matches any account
/// stored for the service.
pub trait CredentialStore: Send + Sync {
    /// Distinct account names stored for a service.
    ///
    /// Returns an empty list when there are none, or when the backend
    /// cannot enumerate accounts.
    fn get_accounts(&self, service: &str) -> Result<Vec<String>, StoreError>;

    /// Get the first credential matching the service and account.
    ///
    /// Returns `Ok(None)` if nothing matches.
    fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>, StoreError>;

    /// Create or overwrite the credential for a service and account.
    ///
    /// Storing an account/secret pair identical to an existing entry is a
    /// no-op.
    fn add_or_update(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError>;

    /// Remove at most one matching credential.
    ///
    /// Returns `Ok(true)` if something was removed.
    fn remove(&self, service: &str, account: Option<&str>) -> Result<bool, StoreError>;
}

/// Normalize an optional account: empty means "any".
pub(crate) fn account_filter(account: Option<&str>) -> Option<&str> {
    account.filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = StoreError::ReadError("disk full".into());
        assert!(err.to_string().contains("read"));

        let err = StoreError::WriteError("permission denied".into());
        assert!(err.to_string().contains("write"));

        let err = StoreError::DeleteError("io error".into());
        assert!(err.to_string().contains("delete"));

        let err = StoreError::PermissionDenied("access denied".into());
        assert!(err.to_string().contains("permission"));

        let err = StoreError::Unavailable("GPG store requires a TTY".into());
        assert_eq!(err.to_string(), "GPG store requires a TTY");
    }

    #[test]
    fn empty_account_matches_any() {
        assert_eq!(account_filter(None), None);
        assert_eq!(account_filter(Some("")), None);
        assert_eq!(account_filter(Some("alice")), Some("alice"));
    }
}
