//! store::selector
//!
//! Chooses, validates and lazily constructs the one credential store used
//! by this process.
//!
//! # Selection
//!
//! The store name comes from `GCRED_CREDENTIAL_STORE` /
//! `credential.credentialStore` (case-insensitive). When unset, Windows
//! uses the Credential Manager and macOS the keychain; other systems have
//! no default and must be configured explicitly.
//!
//! # Validation
//!
//! Every backend has platform and environment requirements that are
//! checked before it is built. A failed check is fatal and explains what
//! to change. Nothing is validated until the store is first used.

use std::path::PathBuf;
use std::sync::OnceLock;

use super::cache_store::CacheCredentialStore;
use super::dpapi_store::DpapiCredentialStore;
use super::file_store::FileCredentialStore;
use super::gpg_store::{GpgCredentialStore, GPG_ID_FILE};
use super::keychain_store::{keystore_enabled, KeychainCredentialStore, KeystoreKind};
use super::traits::{CredentialStore, StoreError};
use crate::core::credential::Credential;
use crate::core::environment::{OsKind, Platform};
use crate::core::settings::{keys, Settings};

/// Where users are pointed for store configuration help.
pub const STORE_HELP: &str = "see the 'Credential stores' section of the gcred README";

/// Known credential store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    WinCredMan,
    Dpapi,
    Keychain,
    SecretService,
    Gpg,
    Cache,
    Plaintext,
}

impl StoreKind {
    pub const ALL: [StoreKind; 7] = [
        StoreKind::WinCredMan,
        StoreKind::Dpapi,
        StoreKind::Keychain,
        StoreKind::SecretService,
        StoreKind::Gpg,
        StoreKind::Cache,
        StoreKind::Plaintext,
    ];

    /// Configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            StoreKind::WinCredMan => "wincredman",
            StoreKind::Dpapi => "dpapi",
            StoreKind::Keychain => "keychain",
            StoreKind::SecretService => "secretservice",
            StoreKind::Gpg => "gpg",
            StoreKind::Cache => "cache",
            StoreKind::Plaintext => "plaintext",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StoreKind::WinCredMan => "Windows Credential Manager",
            StoreKind::Dpapi => "DPAPI protected files",
            StoreKind::Keychain => "macOS keychain",
            StoreKind::SecretService => "freedesktop Secret Service API",
            StoreKind::Gpg => "GPG encrypted files (pass compatible)",
            StoreKind::Cache => "Git's in-memory credential cache",
            StoreKind::Plaintext => "plaintext files (insecure)",
        }
    }

    /// Parse a configured name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Whether this backend can work on `os` at all.
    pub fn supported_on(&self, os: OsKind) -> bool {
        match self {
            StoreKind::WinCredMan | StoreKind::Dpapi => os == OsKind::Windows,
            StoreKind::Keychain => os == OsKind::MacOs,
            StoreKind::SecretService => os == OsKind::Linux,
            StoreKind::Gpg => os.is_posix(),
            StoreKind::Cache => os != OsKind::Windows,
            StoreKind::Plaintext => true,
        }
    }

    /// Backends available on `os`, in listing order.
    pub fn valid_for(os: OsKind) -> Vec<StoreKind> {
        Self::ALL
            .into_iter()
            .filter(|k| k.supported_on(os))
            .collect()
    }

    /// Backend used when none is configured.
    pub fn default_for(os: OsKind) -> Option<StoreKind> {
        match os {
            OsKind::Windows => Some(StoreKind::WinCredMan),
            OsKind::MacOs => Some(StoreKind::Keychain),
            OsKind::Linux | OsKind::OtherUnix => None,
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lazily selected credential store.
///
/// The backend is chosen and validated on first use and then reused for
/// the lifetime of the selector.
pub struct CredentialStoreSelector {
    settings: Settings,
    platform: Platform,
    backing: OnceLock<Box<dyn CredentialStore>>,
}

impl std::fmt::Debug for CredentialStoreSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStoreSelector")
            .field("platform", &self.platform)
            .field("initialized", &self.backing.get().is_some())
            .finish()
    }
}

impl CredentialStoreSelector {
    pub fn new(settings: Settings, platform: Platform) -> Self {
        Self {
            settings,
            platform,
            backing: OnceLock::new(),
        }
    }

    /// The selected store, built on first call.
    pub fn backing(&self) -> Result<&dyn CredentialStore, StoreError> {
        if let Some(store) = self.backing.get() {
            return Ok(store.as_ref());
        }
        let store = self.create()?;
        Ok(self.backing.get_or_init(|| store).as_ref())
    }

    /// Which backend is configured, without validating it.
    pub fn selected_kind(&self) -> Result<StoreKind, StoreError> {
        match self.settings.credential_store_name() {
            Some(name) => StoreKind::parse(&name).ok_or_else(|| {
                self.unavailable(format!(
                    "Unknown credential store '{}'.\n\n{}",
                    name,
                    self.valid_choices()
                ))
            }),
            None => StoreKind::default_for(self.platform.os).ok_or_else(|| {
                self.unavailable(format!(
                    "No credential store has been selected.\n\n\
                     Set the {} environment variable or the {}.{} Git configuration \
                     setting to one of the following options:\n\n{}",
                    keys::CREDENTIAL_STORE_ENV,
                    keys::SECTION,
                    keys::CREDENTIAL_STORE,
                    self.valid_choices()
                ))
            }),
        }
    }

    fn create(&self) -> Result<Box<dyn CredentialStore>, StoreError> {
        let kind = self.selected_kind()?;
        let namespace = self.settings.namespace();
        log::debug!("using credential store '{}'", kind);

        let store: Box<dyn CredentialStore> = match kind {
            StoreKind::WinCredMan => {
                self.validate_windows_credential_manager()?;
                Box::new(KeychainCredentialStore::new(
                    &namespace,
                    KeystoreKind::WindowsCredentialManager,
                )?)
            }
            StoreKind::Dpapi => {
                let root = self.validate_dpapi()?;
                Box::new(DpapiCredentialStore::dpapi(root, &namespace))
            }
            StoreKind::Keychain => {
                self.validate_keychain()?;
                Box::new(KeychainCredentialStore::new(
                    &namespace,
                    KeystoreKind::MacOsKeychain,
                )?)
            }
            StoreKind::SecretService => {
                self.validate_secret_service()?;
                Box::new(KeychainCredentialStore::new(
                    &namespace,
                    KeystoreKind::SecretService,
                )?)
            }
            StoreKind::Gpg => {
                let (gpg_path, root) = self.validate_gpg()?;
                Box::new(GpgCredentialStore::gpg(gpg_path, root, &namespace))
            }
            StoreKind::Cache => {
                let options = self.validate_cache()?;
                Box::new(CacheCredentialStore::new(options.as_deref()))
            }
            StoreKind::Plaintext => {
                let root = self.validate_plaintext()?;
                log::warn!(
                    "storing credentials as plaintext in '{}'; \
                     anyone with access to this directory can read them",
                    root.display()
                );
                Box::new(FileCredentialStore::plaintext(root, &namespace))
            }
        };
        Ok(store)
    }

    fn unavailable(&self, message: String) -> StoreError {
        StoreError::Unavailable(format!("{}\n\nFor more information, {}.", message, STORE_HELP))
    }

    fn valid_choices(&self) -> String {
        StoreKind::valid_for(self.platform.os)
            .into_iter()
            .map(|k| format!("  {:<14} {}", k.name(), k.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn require_os(&self, kind: StoreKind) -> Result<(), StoreError> {
        if kind.supported_on(self.platform.os) {
            return Ok(());
        }
        Err(self.unavailable(format!(
            "Can only use the {} credential store ({}) on {}. This is {}.\n\n{}",
            kind.name(),
            kind.description(),
            match kind {
                StoreKind::WinCredMan | StoreKind::Dpapi => "Windows",
                StoreKind::Keychain => "macOS",
                StoreKind::SecretService => "Linux",
                StoreKind::Gpg | StoreKind::Cache => "POSIX systems",
                StoreKind::Plaintext => "any system",
            },
            self.platform.os.name(),
            self.valid_choices()
        )))
    }

    fn require_keystore_support(&self, kind: StoreKind) -> Result<(), StoreError> {
        if keystore_enabled() {
            return Ok(());
        }
        Err(self.unavailable(format!(
            "The {} credential store ({}) is not enabled in this build. \
             Rebuild with `--features keychain` or choose another store.",
            kind.name(),
            kind.description()
        )))
    }

    fn validate_windows_credential_manager(&self) -> Result<(), StoreError> {
        self.require_os(StoreKind::WinCredMan)?;
        if !self.platform.can_persist_credentials {
            return Err(self.unavailable(
                "Unable to persist credentials with the Windows Credential Manager.\n\n\
                 This logon session does not allow generic credentials to be persisted \
                 (this is common over SSH). Choose a different credential store, such as \
                 'dpapi'."
                    .to_string(),
            ));
        }
        self.require_keystore_support(StoreKind::WinCredMan)
    }

    fn validate_dpapi(&self) -> Result<PathBuf, StoreError> {
        self.require_os(StoreKind::Dpapi)?;
        self.settings
            .dpapi_store_path()
            .or_else(|| self.settings.user_data_dir().map(|d| d.join("store")))
            .ok_or_else(|| self.missing_data_dir(keys::DPAPI_STORE_PATH_ENV))
    }

    fn validate_keychain(&self) -> Result<(), StoreError> {
        self.require_os(StoreKind::Keychain)?;
        self.require_keystore_support(StoreKind::Keychain)
    }

    fn validate_secret_service(&self) -> Result<(), StoreError> {
        self.require_os(StoreKind::SecretService)?;
        if !self.platform.desktop_session {
            return Err(self.unavailable(
                "Cannot use the freedesktop Secret Service API without a graphical \
                 desktop session. Choose a different credential store, such as 'gpg' \
                 or 'cache'."
                    .to_string(),
            ));
        }
        self.require_keystore_support(StoreKind::SecretService)
    }

    fn validate_gpg(&self) -> Result<(PathBuf, PathBuf), StoreError> {
        self.require_os(StoreKind::Gpg)?;

        if !self.platform.desktop_session && !self.settings.has_tty_variable() {
            return Err(self.unavailable(format!(
                "GPG credential storage requires a terminal for passphrase entry \
                 when no desktop session is available. Set the {} environment \
                 variable, for example: export {}=$(tty)",
                keys::GPG_TTY_ENV,
                keys::GPG_TTY_ENV
            )));
        }

        let gpg_path = self.gpg_path()?;

        let root = self
            .settings
            .gpg_pass_store_path()
            .or_else(|| self.settings.home_dir().map(|h| h.join(".password-store")))
            .ok_or_else(|| {
                self.unavailable(format!(
                    "Cannot locate the password store. Set {} to its location.",
                    keys::GPG_PASS_STORE_PATH_ENV
                ))
            })?;

        if !root.join(GPG_ID_FILE).is_file() {
            return Err(self.unavailable(format!(
                "Password store has not been initialized at '{}'; \
                 run `pass init <gpg-id>` to initialize the store.",
                root.display()
            )));
        }

        Ok((gpg_path, root))
    }

    fn gpg_path(&self) -> Result<PathBuf, StoreError> {
        if let Some(path) = self.settings.gpg_path() {
            if !path.is_file() {
                return Err(self.unavailable(format!(
                    "GPG executable does not exist at '{}' (set by {} / {}.{}).",
                    path.display(),
                    keys::GPG_PATH_ENV,
                    keys::SECTION,
                    keys::GPG_PATH
                )));
            }
            return Ok(path);
        }

        let env = self.settings.environment();
        env.locate_executable("gpg2")
            .or_else(|| env.locate_executable("gpg"))
            .ok_or_else(|| {
                self.unavailable(format!(
                    "Unable to find gpg2 or gpg on PATH. Install GnuPG or set {} to the \
                     location of the gpg executable.",
                    keys::GPG_PATH_ENV
                ))
            })
    }

    fn validate_cache(&self) -> Result<Option<String>, StoreError> {
        self.require_os(StoreKind::Cache)?;
        Ok(self.settings.credential_cache_options())
    }

    fn validate_plaintext(&self) -> Result<PathBuf, StoreError> {
        self.settings
            .plaintext_store_path()
            .or_else(|| self.settings.user_data_dir().map(|d| d.join("store")))
            .ok_or_else(|| self.missing_data_dir(keys::PLAINTEXT_STORE_PATH_ENV))
    }

    fn missing_data_dir(&self, envar: &str) -> StoreError {
        self.unavailable(format!(
            "Cannot determine the user data directory. Set {} or {} explicitly.",
            keys::HOME_ENV,
            envar
        ))
    }
}

impl CredentialStore for CredentialStoreSelector {
    fn get_accounts(&self, service: &str) -> Result<Vec<String>, StoreError> {
        self.backing()?.get_accounts(service)
    }

    fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>, StoreError> {
        self.backing()?.get(service, account)
    }

    fn add_or_update(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        self.backing()?.add_or_update(service, account, secret)
    }

    fn remove(&self, service: &str, account: Option<&str>) -> Result<bool, StoreError> {
        self.backing()?.remove(service, account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::Environment;
    use crate::git::mock::MemoryConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn selector(vars: &[(&str, &str)], platform: Platform) -> CredentialStoreSelector {
        let settings = Settings::new(
            Environment::from_vars(vars.iter().copied()),
            Arc::new(MemoryConfig::new()),
        );
        CredentialStoreSelector::new(settings, platform)
    }

    fn linux(desktop: bool) -> Platform {
        Platform::new(OsKind::Linux, desktop)
    }

    fn error_of(selector: &CredentialStoreSelector) -> String {
        match selector.backing() {
            Ok(_) => panic!("expected store selection to fail"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(StoreKind::parse("GPG"), Some(StoreKind::Gpg));
        assert_eq!(StoreKind::parse(" SecretService "), Some(StoreKind::SecretService));
        assert_eq!(StoreKind::parse("vault"), None);
    }

    #[test]
    fn valid_choices_per_os() {
        let names = |os| -> Vec<&str> {
            StoreKind::valid_for(os).iter().map(|k| k.name()).collect()
        };
        assert_eq!(names(OsKind::Windows), vec!["wincredman", "dpapi", "plaintext"]);
        assert_eq!(names(OsKind::MacOs), vec!["keychain", "gpg", "cache", "plaintext"]);
        assert_eq!(
            names(OsKind::Linux),
            vec!["secretservice", "gpg", "cache", "plaintext"]
        );
    }

    #[test]
    fn defaults_per_os() {
        assert_eq!(StoreKind::default_for(OsKind::Windows), Some(StoreKind::WinCredMan));
        assert_eq!(StoreKind::default_for(OsKind::MacOs), Some(StoreKind::Keychain));
        assert_eq!(StoreKind::default_for(OsKind::Linux), None);
    }

    #[test]
    fn unset_on_linux_lists_choices() {
        let msg = error_of(&selector(&[], linux(true)));
        assert!(msg.contains("No credential store has been selected"));
        assert!(msg.contains("GCRED_CREDENTIAL_STORE"));
        assert!(msg.contains("secretservice"));
        assert!(!msg.contains("wincredman"));
        assert!(msg.contains(STORE_HELP));
    }

    #[test]
    fn unknown_name_lists_choices() {
        let msg = error_of(&selector(&[("GCRED_CREDENTIAL_STORE", "vault")], linux(true)));
        assert!(msg.contains("Unknown credential store 'vault'"));
        assert!(msg.contains("plaintext"));
    }

    #[test]
    fn windows_stores_rejected_on_linux() {
        for name in ["wincredman", "dpapi"] {
            let msg = error_of(&selector(&[("GCRED_CREDENTIAL_STORE", name)], linux(true)));
            assert!(msg.contains("only use"), "{name}: {msg}");
            assert!(msg.contains("Windows"), "{name}: {msg}");
        }
    }

    #[test]
    fn keychain_rejected_on_linux() {
        let msg = error_of(&selector(&[("GCRED_CREDENTIAL_STORE", "keychain")], linux(true)));
        assert!(msg.contains("macOS"));
    }

    #[test]
    fn cache_rejected_on_windows() {
        let platform = Platform::new(OsKind::Windows, true);
        let msg = error_of(&selector(&[("GCRED_CREDENTIAL_STORE", "cache")], platform));
        assert!(msg.contains("POSIX"));
    }

    #[test]
    fn wincredman_requires_persistence() {
        let mut platform = Platform::new(OsKind::Windows, true);
        platform.can_persist_credentials = false;
        let msg = error_of(&selector(&[], platform));
        assert!(msg.contains("Unable to persist credentials"));
    }

    #[test]
    fn secret_service_requires_desktop() {
        let msg = error_of(&selector(
            &[("GCRED_CREDENTIAL_STORE", "secretservice")],
            linux(false),
        ));
        assert!(msg.contains("desktop session"));
    }

    #[cfg(not(any(feature = "keychain", windows, target_os = "macos")))]
    #[test]
    fn keystores_need_feature() {
        let msg = error_of(&selector(
            &[("GCRED_CREDENTIAL_STORE", "secretservice")],
            linux(true),
        ));
        assert!(msg.contains("not enabled in this build"));
    }

    #[test]
    fn gpg_headless_without_tty_fails() {
        let msg = error_of(&selector(&[("GCRED_CREDENTIAL_STORE", "gpg")], linux(false)));
        assert!(msg.contains("GPG_TTY"));
    }

    #[test]
    fn gpg_explicit_path_must_exist() {
        let msg = error_of(&selector(
            &[
                ("GCRED_CREDENTIAL_STORE", "gpg"),
                ("GPG_TTY", "/dev/pts/0"),
                ("GCRED_GPG_PATH", "/nonexistent/gpg"),
            ],
            linux(false),
        ));
        assert!(msg.contains("/nonexistent/gpg"));
    }

    #[test]
    fn gpg_store_must_be_initialized() {
        let temp = TempDir::new().expect("temp dir");
        let gpg = temp.path().join("gpg");
        std::fs::write(&gpg, "").expect("write");
        let root = temp.path().join("pass");
        let gpg_str = gpg.to_string_lossy().to_string();
        let root_str = root.to_string_lossy().to_string();

        let s = selector(
            &[
                ("GCRED_CREDENTIAL_STORE", "gpg"),
                ("GCRED_GPG_PATH", &gpg_str),
                ("PASSWORD_STORE_DIR", &root_str),
            ],
            linux(true),
        );
        assert!(error_of(&s).contains("pass init"));

        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(root.join(GPG_ID_FILE), "KEY\n").expect("write");
        let s = selector(
            &[
                ("GCRED_CREDENTIAL_STORE", "gpg"),
                ("GCRED_GPG_PATH", &gpg_str),
                ("PASSWORD_STORE_DIR", &root_str),
            ],
            linux(true),
        );
        assert!(s.backing().is_ok());
    }

    #[test]
    fn plaintext_store_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().join("store").to_string_lossy().to_string();
        let s = selector(
            &[
                ("GCRED_CREDENTIAL_STORE", "Plaintext"),
                ("GCRED_PLAINTEXT_STORE_PATH", &root),
            ],
            linux(false),
        );

        s.add_or_update("https://example.com", "alice", "pw").expect("add");
        assert_eq!(s.get_accounts("https://example.com").expect("accounts"), vec!["alice"]);
        assert!(s.remove("https://example.com", None).expect("remove"));
    }

    #[test]
    fn plaintext_defaults_under_user_data_dir() {
        let temp = TempDir::new().expect("temp dir");
        let home = temp.path().to_string_lossy().to_string();
        let s = selector(
            &[("GCRED_CREDENTIAL_STORE", "plaintext"), ("GCRED_HOME", &home)],
            linux(false),
        );

        s.add_or_update("https://example.com", "alice", "pw").expect("add");
        assert!(temp.path().join("store").join("git").exists());
    }

    #[test]
    fn backing_is_built_once() {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().join("store").to_string_lossy().to_string();
        let s = selector(
            &[
                ("GCRED_CREDENTIAL_STORE", "plaintext"),
                ("GCRED_PLAINTEXT_STORE_PATH", &root),
            ],
            linux(false),
        );

        let first = s.backing().expect("first") as *const dyn CredentialStore as *const ();
        let second = s.backing().expect("second") as *const dyn CredentialStore as *const ();
        assert_eq!(first, second);
    }

    #[test]
    fn failed_selection_is_retried() {
        let s = selector(&[("GCRED_CREDENTIAL_STORE", "vault")], linux(false));
        assert!(s.backing().is_err());
        assert!(s.backing().is_err());
    }
}
