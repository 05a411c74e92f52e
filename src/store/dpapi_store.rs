//! store::dpapi_store
//!
//! File store whose entries are sealed with Windows DPAPI.
//!
//! Entries use the plaintext TOML encoding inside a DPAPI blob bound to the
//! current user, so the files are useless to other accounts and machines.

use std::path::{Path, PathBuf};

use super::file_store::{CredentialFileCodec, FileCredentialStore, PlaintextCodec, StoredEntry};
use super::traits::StoreError;
use super::windows;

/// DPAPI-sealed TOML encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct DpapiCodec;

impl CredentialFileCodec for DpapiCodec {
    fn extension(&self) -> &'static str {
        "dpapi"
    }

    fn encode(&self, path: &Path, entry: &StoredEntry) -> Result<Vec<u8>, StoreError> {
        let plain = PlaintextCodec.encode(path, entry)?;
        windows::protect(&plain)
            .map_err(|e| StoreError::WriteError(format!("cannot encrypt credential: {}", e)))
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<StoredEntry, StoreError> {
        let plain = windows::unprotect(bytes)?;
        PlaintextCodec.decode(path, &plain)
    }
}

pub type DpapiCredentialStore = FileCredentialStore<DpapiCodec>;

impl FileCredentialStore<DpapiCodec> {
    /// DPAPI store rooted at `root`.
    pub fn dpapi(root: PathBuf, namespace: &str) -> Self {
        Self::new(root, namespace, DpapiCodec)
    }
}
