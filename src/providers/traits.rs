//! providers::traits
//!
//! Host provider trait definition.
//!
//! # Design
//!
//! A host provider knows how to recognise a family of remotes and how to
//! obtain credentials for them. The trait is async because generating a
//! credential may involve network I/O or waiting on the user.
//!
//! Recognition happens in two steps, both free of I/O:
//! - [`HostProvider::is_supported`] looks at the request alone
//! - [`HostProvider::is_supported_response`] looks at the response to a
//!   single HTTP `HEAD` probe of the remote, shared by all providers
//!
//! # Example
//!
//! ```ignore
//! use gcred::providers::HostProvider;
//!
//! async fn fill(provider: &dyn HostProvider, input: &InputArguments, store: &dyn CredentialStore)
//!     -> Result<(), ProviderError>
//! {
//!     let credential = provider.get_credential(input, store).await?;
//!     // Hand credential back to Git (never print the password elsewhere!)
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::core::credential::Credential;
use crate::core::input::InputArguments;
use crate::store::{CredentialStore, StoreError};
use crate::ui::prompts::PromptError;

/// Errors from host provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Asking the user failed or was refused.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The request has no protocol or host to build a remote URI from.
    #[error("unable to determine the remote URI from the credential request")]
    NoRemoteUri,

    /// No credential could be obtained.
    #[error("{0}")]
    CredentialUnavailable(String),
}

/// Bucket a provider is registered in. Higher priorities are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostProviderPriority {
    Low,
    Normal,
    High,
}

impl std::fmt::Display for HostProviderPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostProviderPriority::Low => write!(f, "low"),
            HostProviderPriority::Normal => write!(f, "normal"),
            HostProviderPriority::High => write!(f, "high"),
        }
    }
}

/// Status and headers of the auto-detection probe.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: HeaderMap,
}

impl ProbeResponse {
    pub fn new(status: u16, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    /// Whether a header is present (names are case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// The service name credentials for a request are stored under.
///
/// This is the remote URI without a trailing slash.
pub fn default_service_name(input: &InputArguments) -> Result<String, ProviderError> {
    let uri = input.remote_uri().ok_or(ProviderError::NoRemoteUri)?;
    Ok(uri.as_str().trim_end_matches('/').to_string())
}

/// A pluggable host provider.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Identity
///
/// `id` and every entry of `supported_authority_ids` are matched
/// case-insensitively against user overrides. The value `auto` is
/// reserved and rejected at registration.
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// Stable identifier, used by `credential.provider`.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Legacy `credential.authority` values this provider answers to.
    fn supported_authority_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this provider recognises the request without any I/O.
    fn is_supported(&self, input: &InputArguments) -> bool;

    /// Whether this provider recognises the remote from the probe response.
    ///
    /// `None` means no response is available (probing disabled, not
    /// possible for this scheme, or failed).
    fn is_supported_response(&self, _response: Option<&ProbeResponse>) -> bool {
        false
    }

    /// Service name used for credential storage.
    fn service_name(&self, input: &InputArguments) -> Result<String, ProviderError> {
        default_service_name(input)
    }

    /// Create a new credential, typically by asking the user.
    async fn generate_credential(&self, input: &InputArguments)
        -> Result<Credential, ProviderError>;

    /// Return a stored credential, or generate a new one.
    ///
    /// Generated credentials are not stored here; Git calls `store` once
    /// it has seen them work.
    async fn get_credential(
        &self,
        input: &InputArguments,
        store: &dyn CredentialStore,
    ) -> Result<Credential, ProviderError> {
        let service = self.service_name(input)?;
        log::debug!("looking for existing credential for '{}'", service);

        if let Some(credential) = store.get(&service, input.username())? {
            log::debug!("found stored credential for '{}'", service);
            return Ok(credential);
        }

        log::debug!("no stored credential for '{}'; generating one", service);
        self.generate_credential(input).await
    }

    /// Persist the credential Git reports as working.
    async fn store_credential(
        &self,
        input: &InputArguments,
        store: &dyn CredentialStore,
    ) -> Result<(), ProviderError> {
        let service = self.service_name(input)?;
        match (input.username(), input.password()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                log::debug!("storing credential for '{}'", service);
                store.add_or_update(&service, user, password)?;
            }
            _ => log::debug!("not storing credential for '{}': incomplete", service),
        }
        Ok(())
    }

    /// Forget the credential Git reports as rejected.
    async fn erase_credential(
        &self,
        input: &InputArguments,
        store: &dyn CredentialStore,
    ) -> Result<(), ProviderError> {
        let service = self.service_name(input)?;
        if store.remove(&service, input.username())? {
            log::debug!("erased credential for '{}'", service);
        } else {
            log::debug!("no credential to erase for '{}'", service);
        }
        Ok(())
    }

    /// Release any resources held by the provider.
    fn dispose(&self) {}
}
