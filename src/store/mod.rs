//! store
//!
//! Credential storage backends and backend selection.
//!
//! # Architecture
//!
//! Credentials are stored through the [`CredentialStore`] trait, which has
//! multiple implementations:
//!
//! - [`KeychainCredentialStore`]: OS keystore (Windows Credential Manager,
//!   macOS keychain, Secret Service; feature-gated)
//! - [`DpapiCredentialStore`]: DPAPI-sealed files (Windows)
//! - [`GpgCredentialStore`]: GPG-encrypted files in a `pass` store
//! - [`CacheCredentialStore`]: Git's `credential-cache` daemon
//! - [`FileCredentialStore::plaintext`]: unencrypted files
//!
//! [`CredentialStoreSelector`] picks exactly one of them from settings and
//! platform, validating it first.
//!
//! # Security
//!
//! All credential store implementations follow these security rules:
//!
//! - Secrets are **never** logged or included in error messages
//! - File stores use 0600 permissions on Unix (owner read/write only)
//! - All file writes are atomic (temp file + rename)
//!
//! # Example
//!
//! ```ignore
//! use gcred::store::{CredentialStore, CredentialStoreSelector};
//!
//! let store = CredentialStoreSelector::new(settings, platform);
//! store.add_or_update("https://example.com", "alice", "s3cr3t")?;
//! ```

mod cache_store;
mod dpapi_store;
mod file_store;
mod gpg_store;
mod keychain_store;
mod selector;
mod traits;
pub mod windows;

pub use cache_store::CacheCredentialStore;
pub use dpapi_store::{DpapiCodec, DpapiCredentialStore};
pub use file_store::{
    service_slug, CredentialFileCodec, FileCredentialStore, PlaintextCodec, StoredEntry,
};
pub use gpg_store::{GpgCodec, GpgCredentialStore, GPG_ID_FILE};
pub use keychain_store::{keystore_enabled, KeychainCredentialStore, KeystoreKind};
pub use selector::{CredentialStoreSelector, StoreKind, STORE_HELP};
pub use traits::{CredentialStore, StoreError};
