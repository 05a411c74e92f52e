//! store::file_store
//!
//! File-based credential storage.
//!
//! # Layout
//!
//! One file per credential, grouped by service slug:
//!
//! ```text
//! <root>/<namespace>/<scheme>/<host>[_<port>]/<path...>/<account>.<ext>
//! ```
//!
//! Every file records its own service and account, so lookups match on
//! file contents, not on file names. Name components are percent-encoded,
//! so distinct accounts get distinct names. Services that share a
//! directory (for example `https://host` and `https://host/`) may still
//! want the same name; the second one gets a `~<n>` suffix.
//!
//! # Security
//!
//! - The store root is created with 0700 permissions on Unix. An existing
//!   root keeps whatever permissions the user gave it.
//! - Credential files are written with 0600 permissions on Unix
//! - All writes are atomic (write to temp file, then rename)
//! - Reads take a shared lock so concurrent helper processes can read
//! - Secrets are NEVER logged, printed, or included in error messages
//!
//! # Encodings
//!
//! The on-disk encoding is pluggable through [`CredentialFileCodec`]:
//! [`PlaintextCodec`] writes TOML; the GPG and DPAPI stores wrap their
//! encryption around the same layout.
//!
//! # Example
//!
//! ```ignore
//! use gcred::store::{CredentialStore, FileCredentialStore};
//!
//! let store = FileCredentialStore::plaintext("/tmp/store".into(), "git");
//! store.add_or_update("https://example.com", "alice", "s3cr3t")?;
//! assert_eq!(store.get_accounts("https://example.com")?, vec!["alice"]);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use url::Url;

use super::traits::{account_filter, CredentialStore, StoreError};
use crate::core::credential::Credential;

/// A credential as persisted by file-backed stores.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub service: String,
    pub account: String,
    pub password: String,
}

impl std::fmt::Debug for StoredEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredEntry")
            .field("service", &self.service)
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Encoding of a single credential file.
pub trait CredentialFileCodec: Send + Sync {
    /// File extension, without the dot.
    fn extension(&self) -> &'static str;

    /// Encode an entry that will be written to `path`.
    fn encode(&self, path: &Path, entry: &StoredEntry) -> Result<Vec<u8>, StoreError>;

    /// Decode the contents of the file at `path`.
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<StoredEntry, StoreError>;
}

/// Unencrypted TOML encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCodec;

impl CredentialFileCodec for PlaintextCodec {
    fn extension(&self) -> &'static str {
        "credential"
    }

    fn encode(&self, _path: &Path, entry: &StoredEntry) -> Result<Vec<u8>, StoreError> {
        toml::to_string_pretty(entry)
            .map(String::into_bytes)
            .map_err(|e| StoreError::WriteError(format!("cannot serialize credential: {}", e)))
    }

    fn decode(&self, _path: &Path, bytes: &[u8]) -> Result<StoredEntry, StoreError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| StoreError::ReadError("credential file is not valid UTF-8".into()))?;
        toml::from_str(text)
            .map_err(|_| StoreError::ReadError("cannot parse credential file".into()))
    }
}

/// File-backed credential store, generic over the file encoding.
#[derive(Debug)]
pub struct FileCredentialStore<C> {
    /// Root directory of the store
    root: PathBuf,
    /// Namespace prefix for service slugs
    namespace: Option<String>,
    codec: C,
}

impl FileCredentialStore<PlaintextCodec> {
    /// Plaintext store rooted at `root`.
    pub fn plaintext(root: PathBuf, namespace: &str) -> Self {
        Self::new(root, namespace, PlaintextCodec)
    }
}

impl<C: CredentialFileCodec> FileCredentialStore<C> {
    pub fn new(root: PathBuf, namespace: &str, codec: C) -> Self {
        let namespace = Some(namespace.trim().to_string()).filter(|n| !n.is_empty());
        Self {
            root,
            namespace,
            codec,
        }
    }

    /// Get the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding credentials for a service.
    pub fn service_dir(&self, service: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for component in service_slug(self.namespace.as_deref(), service) {
            dir.push(component);
        }
        dir
    }

    fn entry_path(&self, service: &str, account: &str) -> PathBuf {
        self.service_dir(service)
            .join(format!("{}.{}", encode_component(account), self.codec.extension()))
    }

    /// First free file name for a new entry.
    ///
    /// Any existing file is taken: it either belongs to another
    /// service/account or could not be decoded.
    fn vacant_entry_path(&self, service: &str, account: &str) -> Result<PathBuf, StoreError> {
        let first = self.entry_path(service, account);
        if !first.exists() {
            return Ok(first);
        }

        let dir = self.service_dir(service);
        let stem = encode_component(account);
        for n in 1..=MAX_NAME_SUFFIX {
            let candidate = dir.join(format!("{}~{}.{}", stem, n, self.codec.extension()));
            if !candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(StoreError::WriteError(format!(
            "too many conflicting credential files in '{}'",
            dir.display()
        )))
    }

    /// All readable entries in a service directory, with their paths.
    ///
    /// Unreadable or corrupt files are skipped.
    fn entries(&self, service: &str) -> Result<Vec<(PathBuf, StoredEntry)>, StoreError> {
        let dir = self.service_dir(service);
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::ReadError(format!(
                    "cannot list '{}': {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut paths: Vec<PathBuf> = listing
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some(self.codec.extension()))
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read_entry(&path) {
                Ok(entry) if entry.service == service => entries.push((path, entry)),
                Ok(_) => {}
                Err(e) => log::debug!("skipping unreadable credential '{}': {}", path.display(), e),
            }
        }
        Ok(entries)
    }

    fn read_entry(&self, path: &Path) -> Result<StoredEntry, StoreError> {
        let mut file = File::open(path)
            .map_err(|e| StoreError::ReadError(format!("cannot open credential file: {}", e)))?;
        file.lock_shared()
            .map_err(|e| StoreError::ReadError(format!("cannot lock credential file: {}", e)))?;

        let mut bytes = Vec::new();
        let read = file.read_to_end(&mut bytes);
        let _ = FileExt::unlock(&file);
        read.map_err(|e| StoreError::ReadError(format!("cannot read credential file: {}", e)))?;

        self.codec.decode(path, &bytes)
    }

    fn find(
        &self,
        service: &str,
        account: Option<&str>,
    ) -> Result<Option<(PathBuf, StoredEntry)>, StoreError> {
        let account = account_filter(account);
        Ok(self
            .entries(service)?
            .into_iter()
            .find(|(_, e)| account.map_or(true, |a| e.account == a)))
    }

    /// Create the store root with owner-only permissions if it is missing.
    fn ensure_root(&self) -> Result<(), StoreError> {
        if self.root.exists() {
            return Ok(());
        }

        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::WriteError(format!("cannot create store directory: {}", e)))?;

        #[cfg(unix)]
        {
            let permissions = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.root, permissions).map_err(|e| {
                StoreError::WriteError(format!("cannot set store directory permissions: {}", e))
            })?;
        }

        Ok(())
    }

    /// Refuse to replace a file holding some other credential.
    fn check_overwrite(&self, path: &Path, entry: &StoredEntry) -> Result<(), StoreError> {
        if !path.exists() {
            return Ok(());
        }
        match self.read_entry(path) {
            Ok(existing) if existing.service == entry.service && existing.account == entry.account => {
                Ok(())
            }
            Ok(_) => Err(StoreError::WriteError(format!(
                "refusing to overwrite '{}': it holds a different credential",
                path.display()
            ))),
            Err(e) => Err(StoreError::WriteError(format!(
                "refusing to overwrite unreadable credential '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write an entry atomically with owner-only permissions.
    fn write_entry(&self, path: &Path, entry: &StoredEntry) -> Result<(), StoreError> {
        self.ensure_root()?;
        self.check_overwrite(path, entry)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = self.codec.encode(path, entry)?;

        // Unique temp name: other helper processes may be writing too
        let temp_path = path.with_file_name(format!(".{}.tmp", uuid::Uuid::new_v4()));

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&temp_path)
                .map_err(|e| StoreError::WriteError(format!("cannot create temp file: {}", e)))?;

            // Set restrictive permissions BEFORE writing content (Unix only)
            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions).map_err(|e| {
                    StoreError::WriteError(format!("cannot set permissions: {}", e))
                })?;
            }

            file.write_all(&content)
                .and_then(|_| file.sync_all())
                .map_err(|e| {
                    let _ = fs::remove_file(&temp_path);
                    StoreError::WriteError(format!("cannot write credential: {}", e))
                })?;
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::WriteError(format!("cannot rename temp file: {}", e))
        })
    }
}

impl<C: CredentialFileCodec> CredentialStore for FileCredentialStore<C> {
    fn get_accounts(&self, service: &str) -> Result<Vec<String>, StoreError> {
        let mut accounts: Vec<String> = Vec::new();
        for (_, entry) in self.entries(service)? {
            if !accounts.contains(&entry.account) {
                accounts.push(entry.account);
            }
        }
        Ok(accounts)
    }

    fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .find(service, account)?
            .map(|(_, e)| Credential::new(e.account, e.password)))
    }

    fn add_or_update(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        let existing = self.find(service, Some(account).filter(|a| !a.is_empty()))?;
        let path = match existing {
            Some((_, entry)) if entry.account == account && entry.password == secret => {
                return Ok(());
            }
            Some((path, entry)) if entry.account == account => path,
            _ => self.vacant_entry_path(service, account)?,
        };

        let entry = StoredEntry {
            service: service.to_string(),
            account: account.to_string(),
            password: secret.to_string(),
        };
        self.write_entry(&path, &entry)
    }

    fn remove(&self, service: &str, account: Option<&str>) -> Result<bool, StoreError> {
        match self.find(service, account)? {
            Some((path, _)) => match fs::remove_file(&path) {
                Ok(()) => Ok(true),
                // Another process got there first
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(StoreError::DeleteError(format!(
                    "cannot delete credential file: {}",
                    e
                ))),
            },
            None => Ok(false),
        }
    }
}

/// Suffixes tried before giving up on a free file name.
const MAX_NAME_SUFFIX: usize = 64;

/// Path components identifying a service on disk.
///
/// `[namespace] / scheme / host[_port] / path...` for URLs; the encoded
/// service string otherwise.
pub fn service_slug(namespace: Option<&str>, service: &str) -> Vec<String> {
    let mut components = Vec::new();
    if let Some(ns) = namespace.filter(|n| !n.trim().is_empty()) {
        components.push(encode_component(ns.trim()));
    }

    match Url::parse(service) {
        Ok(url) if url.host_str().is_some() => {
            components.push(encode_component(url.scheme()));
            let host = url.host_str().unwrap_or_default();
            match url.port() {
                Some(port) => components.push(encode_component(&format!("{}_{}", host, port))),
                None => components.push(encode_component(host)),
            }
            components.extend(
                url.path()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(encode_component),
            );
        }
        _ => components.push(encode_component(service)),
    }

    components
}

/// Make a string safe as a single path component on every platform.
///
/// Reserved characters, control characters and `%` itself are
/// percent-encoded, so the mapping is reversible. `.` and `..` encode
/// their dots; the empty string becomes a lone `%`, which no other input
/// produces.
fn encode_component(s: &str) -> String {
    match s {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        } else {
            out.push(c);
        }
    }
    out
}
