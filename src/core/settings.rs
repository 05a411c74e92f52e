//! core::settings
//!
//! Layered settings lookup over environment variables and Git config.
//!
//! # Precedence
//!
//! For every setting, in order (first hit wins):
//! 1. The environment variable, if set and non-empty
//! 2. URL-scoped Git config entries, most specific scope first
//!    (`credential.https://example.com/org/repo.provider`, ...)
//! 3. The unscoped Git config entry (`credential.provider`)
//!
//! # Scope Unfolding
//!
//! A remote URI `https://dev.azure.com/org/repo` unfolds into:
//!
//! ```text
//! https://dev.azure.com/org/repo
//! https://dev.azure.com/org
//! https://dev.azure.com
//! https://azure.com
//! ```
//!
//! Path components are dropped right to left, then sub-domains left to
//! right while the host still contains a dot.

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use super::environment::{parse_bool, Environment};
use crate::git::{ConfigLevel, GitConfiguration};

/// Names of environment variables and Git config entries.
pub mod keys {
    /// Git config section for all helper settings.
    pub const SECTION: &str = "credential";

    pub const PROVIDER_ENV: &str = "GCRED_PROVIDER";
    pub const PROVIDER: &str = "provider";

    pub const AUTHORITY_ENV: &str = "GCRED_AUTHORITY";
    pub const AUTHORITY: &str = "authority";

    pub const AUTODETECT_TIMEOUT_ENV: &str = "GCRED_AUTODETECT_TIMEOUT";
    pub const AUTODETECT_TIMEOUT: &str = "autoDetectTimeout";

    pub const CREDENTIAL_STORE_ENV: &str = "GCRED_CREDENTIAL_STORE";
    pub const CREDENTIAL_STORE: &str = "credentialStore";

    pub const CACHE_OPTIONS_ENV: &str = "GCRED_CREDENTIAL_CACHE_OPTIONS";
    pub const CACHE_OPTIONS: &str = "cacheOptions";

    pub const PLAINTEXT_STORE_PATH_ENV: &str = "GCRED_PLAINTEXT_STORE_PATH";
    pub const PLAINTEXT_STORE_PATH: &str = "plaintextStorePath";

    pub const DPAPI_STORE_PATH_ENV: &str = "GCRED_DPAPI_STORE_PATH";
    pub const DPAPI_STORE_PATH: &str = "dpapiStorePath";

    pub const GPG_PATH_ENV: &str = "GCRED_GPG_PATH";
    pub const GPG_PATH: &str = "gpgPath";

    pub const GPG_PASS_STORE_PATH_ENV: &str = "PASSWORD_STORE_DIR";
    pub const GPG_PASS_STORE_PATH: &str = "gpgPassStorePath";

    pub const NAMESPACE_ENV: &str = "GCRED_NAMESPACE";
    pub const NAMESPACE: &str = "namespace";

    pub const INTERACTIVE_ENV: &str = "GCRED_INTERACTIVE";
    pub const INTERACTIVE: &str = "interactive";

    pub const HTTP_PROXY_ENV: &str = "GCRED_HTTP_PROXY";
    pub const HTTP_SECTION: &str = "http";
    pub const HTTP_PROXY: &str = "proxy";

    pub const HOME_ENV: &str = "GCRED_HOME";

    pub const GPG_TTY_ENV: &str = "GPG_TTY";
    pub const SSH_TTY_ENV: &str = "SSH_TTY";
}

/// Value meaning "no override, auto-detect".
pub const AUTO_SENTINEL: &str = "auto";

/// Default probe timeout in milliseconds.
pub const DEFAULT_AUTODETECT_TIMEOUT_MS: i64 = 2000;

/// Default credential store namespace.
pub const DEFAULT_NAMESPACE: &str = "git";

/// Read-only settings view for one invocation.
#[derive(Clone)]
pub struct Settings {
    env: Environment,
    git: Arc<dyn GitConfiguration>,
    remote_uri: Option<Url>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("remote_uri", &self.remote_uri.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(env: Environment, git: Arc<dyn GitConfiguration>) -> Self {
        Self {
            env,
            git,
            remote_uri: None,
        }
    }

    /// Scope URL-aware lookups to the given remote.
    pub fn with_remote_uri(mut self, uri: Option<Url>) -> Self {
        self.remote_uri = uri;
        self
    }

    pub fn remote_uri(&self) -> Option<&Url> {
        self.remote_uri.as_ref()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn git(&self) -> &dyn GitConfiguration {
        self.git.as_ref()
    }

    /// Look up a setting: environment first, then Git config.
    ///
    /// When a remote URI is set, URL-scoped config entries are consulted
    /// from most to least specific before the unscoped entry.
    pub fn try_get_setting(&self, envar: &str, section: &str, property: &str) -> Option<String> {
        if let Some(value) = self.env.var(envar) {
            return Some(value.to_string());
        }

        if let Some(uri) = &self.remote_uri {
            for scope in configuration_scopes(uri) {
                let name = format!("{}.{}.{}", section, scope, property);
                if let Some(value) = self.read_config(&name) {
                    return Some(value);
                }
            }
        }

        self.read_config(&format!("{}.{}", section, property))
    }

    /// Like [`try_get_setting`](Self::try_get_setting), expanding a leading `~`.
    pub fn try_get_path_setting(
        &self,
        envar: &str,
        section: &str,
        property: &str,
    ) -> Option<PathBuf> {
        self.try_get_setting(envar, section, property)
            .map(|value| expand_home(&value))
    }

    fn read_config(&self, name: &str) -> Option<String> {
        match self.git.get(ConfigLevel::All, name) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("cannot read git config '{}': {}", name, e);
                None
            }
        }
    }

    /// Explicit host provider override, if any.
    pub fn provider_override(&self) -> Option<String> {
        self.try_get_setting(keys::PROVIDER_ENV, keys::SECTION, keys::PROVIDER)
    }

    /// Deprecated authority override, if any.
    pub fn legacy_authority_override(&self) -> Option<String> {
        self.try_get_setting(keys::AUTHORITY_ENV, keys::SECTION, keys::AUTHORITY)
    }

    /// Probe timeout in milliseconds. Zero or negative disables probing.
    pub fn auto_detect_timeout_ms(&self) -> i64 {
        match self.try_get_setting(
            keys::AUTODETECT_TIMEOUT_ENV,
            keys::SECTION,
            keys::AUTODETECT_TIMEOUT,
        ) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "invalid auto-detect timeout '{}', using {}ms",
                    value,
                    DEFAULT_AUTODETECT_TIMEOUT_MS
                );
                DEFAULT_AUTODETECT_TIMEOUT_MS
            }),
            None => DEFAULT_AUTODETECT_TIMEOUT_MS,
        }
    }

    pub fn credential_store_name(&self) -> Option<String> {
        self.try_get_setting(
            keys::CREDENTIAL_STORE_ENV,
            keys::SECTION,
            keys::CREDENTIAL_STORE,
        )
    }

    pub fn credential_cache_options(&self) -> Option<String> {
        self.try_get_setting(keys::CACHE_OPTIONS_ENV, keys::SECTION, keys::CACHE_OPTIONS)
    }

    pub fn plaintext_store_path(&self) -> Option<PathBuf> {
        self.try_get_path_setting(
            keys::PLAINTEXT_STORE_PATH_ENV,
            keys::SECTION,
            keys::PLAINTEXT_STORE_PATH,
        )
    }

    pub fn dpapi_store_path(&self) -> Option<PathBuf> {
        self.try_get_path_setting(
            keys::DPAPI_STORE_PATH_ENV,
            keys::SECTION,
            keys::DPAPI_STORE_PATH,
        )
    }

    pub fn gpg_path(&self) -> Option<PathBuf> {
        self.try_get_path_setting(keys::GPG_PATH_ENV, keys::SECTION, keys::GPG_PATH)
    }

    pub fn gpg_pass_store_path(&self) -> Option<PathBuf> {
        self.try_get_path_setting(
            keys::GPG_PASS_STORE_PATH_ENV,
            keys::SECTION,
            keys::GPG_PASS_STORE_PATH,
        )
    }

    /// Namespace prefix for stored credentials (default `git`).
    pub fn namespace(&self) -> String {
        self.try_get_setting(keys::NAMESPACE_ENV, keys::SECTION, keys::NAMESPACE)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    /// Whether interactive prompts are allowed (default true).
    pub fn is_interactive(&self) -> bool {
        match self.try_get_setting(keys::INTERACTIVE_ENV, keys::SECTION, keys::INTERACTIVE) {
            Some(value) if value.eq_ignore_ascii_case("never") => false,
            Some(value) => parse_bool(&value).unwrap_or(true),
            None => true,
        }
    }

    /// Proxy URL for outgoing HTTP requests.
    pub fn http_proxy(&self) -> Option<String> {
        self.try_get_setting(keys::HTTP_PROXY_ENV, keys::HTTP_SECTION, keys::HTTP_PROXY)
    }

    /// Whether a terminal for GPG pinentry is declared.
    pub fn has_tty_variable(&self) -> bool {
        self.env.var(keys::GPG_TTY_ENV).is_some() || self.env.var(keys::SSH_TTY_ENV).is_some()
    }

    /// Per-user data directory: `$GCRED_HOME` or `~/.gcred`.
    pub fn user_data_dir(&self) -> Option<PathBuf> {
        if let Some(home) = self.env.var(keys::HOME_ENV) {
            return Some(expand_home(home));
        }
        home_dir(&self.env).map(|h| h.join(".gcred"))
    }

    /// The user's home directory.
    pub fn home_dir(&self) -> Option<PathBuf> {
        home_dir(&self.env)
    }
}

fn home_dir(env: &Environment) -> Option<PathBuf> {
    env.var("HOME")
        .or_else(|| env.var("USERPROFILE"))
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/").or_else(|| value.strip_prefix("~\\")) {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None if value == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

/// Unfold a remote URI into Git config scopes, most specific first.
pub fn configuration_scopes(uri: &Url) -> Vec<String> {
    let mut scopes = Vec::new();
    let Some(host) = uri.host_str() else {
        return scopes;
    };
    let scheme = uri.scheme();
    let port = uri.port().map(|p| format!(":{}", p)).unwrap_or_default();

    let mut path = uri.path().trim_matches('/').to_string();
    while !path.is_empty() {
        scopes.push(format!("{}://{}{}/{}", scheme, host, port, path));
        match path.rfind('/') {
            Some(idx) => path.truncate(idx),
            None => break,
        }
    }

    scopes.push(format!("{}://{}{}", scheme, host, port));

    let mut domain = host;
    while let Some((_, parent)) = domain.split_once('.') {
        if !parent.contains('.') {
            break;
        }
        scopes.push(format!("{}://{}", scheme, parent));
        domain = parent;
    }

    scopes
}
