//! providers::registry
//!
//! Host provider registration and resolution.
//!
//! # Resolution Order
//!
//! 1. Explicit provider override (`GCRED_PROVIDER` / `credential.provider`)
//! 2. Deprecated authority override (`GCRED_AUTHORITY` / `credential.authority`)
//! 3. Auto-detection, tier by tier from High to Low priority:
//!    a. static [`HostProvider::is_supported`] checks
//!    b. one shared HTTP probe of the remote (http/https only)
//!    c. [`HostProvider::is_supported_response`] checks
//!
//! An override naming an unknown provider is reported and auto-detection
//! takes over. When a match was made with a probe response in hand, the
//! result is remembered in global Git config so later invocations resolve
//! statically through the override.
//!
//! # Failure Policy
//!
//! Probe failures and memoization failures are warnings. Only exhausting
//! every tier (or lacking a remote URI) is fatal.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::probe::Prober;
use super::traits::{HostProvider, HostProviderPriority, ProbeResponse};
use crate::core::input::InputArguments;
use crate::core::settings::{configuration_scopes, keys, Settings, AUTO_SENTINEL};
use crate::git::ConfigLevel;

/// Errors from provider registration and resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a host provider cannot use the reserved id '{AUTO_SENTINEL}'")]
    ReservedId,

    #[error("host provider '{0}' cannot list the reserved authority id '{AUTO_SENTINEL}'")]
    ReservedAuthority(String),

    #[error("unable to detect host provider without a remote URI (protocol and host are required)")]
    NoRemoteUri,

    #[error("no host provider available to service this request")]
    NoProvider,
}

/// Registered host providers, bucketed by priority.
pub struct HostProviderRegistry {
    settings: Settings,
    prober: Arc<dyn Prober>,
    providers: BTreeMap<HostProviderPriority, Vec<Box<dyn HostProvider>>>,
}

impl std::fmt::Debug for HostProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<(HostProviderPriority, Vec<&str>)> = self
            .providers
            .iter()
            .map(|(p, v)| (*p, v.iter().map(|h| h.id()).collect()))
            .collect();
        f.debug_struct("HostProviderRegistry")
            .field("providers", &ids)
            .finish_non_exhaustive()
    }
}

impl HostProviderRegistry {
    pub fn new(settings: Settings, prober: Arc<dyn Prober>) -> Self {
        Self {
            settings,
            prober,
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider in a priority bucket.
    ///
    /// Providers in the same bucket are tried in registration order.
    pub fn register(
        &mut self,
        provider: Box<dyn HostProvider>,
        priority: HostProviderPriority,
    ) -> Result<(), RegistryError> {
        if provider.id().eq_ignore_ascii_case(AUTO_SENTINEL) {
            return Err(RegistryError::ReservedId);
        }
        if provider
            .supported_authority_ids()
            .iter()
            .any(|a| a.eq_ignore_ascii_case(AUTO_SENTINEL))
        {
            return Err(RegistryError::ReservedAuthority(provider.id().to_string()));
        }

        log::debug!(
            "registered host provider '{}' with {} priority",
            provider.id(),
            priority
        );
        self.providers.entry(priority).or_default().push(provider);
        Ok(())
    }

    /// All providers, highest priority first.
    fn iter(&self) -> impl Iterator<Item = &dyn HostProvider> {
        self.providers
            .values()
            .rev()
            .flat_map(|bucket| bucket.iter().map(|p| p.as_ref()))
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the provider that should service a request.
    pub async fn get_provider(
        &self,
        input: &InputArguments,
    ) -> Result<&dyn HostProvider, RegistryError> {
        let remote = input.remote_uri();
        let settings = self.settings.clone().with_remote_uri(remote.clone());

        let provider_override = settings.provider_override();
        let authority_override = settings.legacy_authority_override();
        if authority_override.is_some() {
            log::warn!(
                "the `{}.{}` and `{}` settings are deprecated; use `{}.{}` or `{}` instead",
                keys::SECTION,
                keys::AUTHORITY,
                keys::AUTHORITY_ENV,
                keys::SECTION,
                keys::PROVIDER,
                keys::PROVIDER_ENV
            );
        }

        if let Some(id) = provider_override.filter(|id| !id.eq_ignore_ascii_case(AUTO_SENTINEL)) {
            log::debug!("host provider override '{}' found", id);
            match self.iter().find(|p| p.id().eq_ignore_ascii_case(&id)) {
                Some(provider) => return Ok(provider),
                None => log::warn!(
                    "a host provider with id '{}' could not be found; \
                     falling back to auto-detection",
                    id
                ),
            }
        }

        if let Some(authority) =
            authority_override.filter(|a| !a.eq_ignore_ascii_case(AUTO_SENTINEL))
        {
            log::debug!("authority override '{}' found", authority);
            let found = self.iter().find(|p| {
                p.supported_authority_ids()
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(&authority))
            });
            match found {
                Some(provider) => return Ok(provider),
                None => log::warn!(
                    "a host provider supporting authority '{}' could not be found; \
                     falling back to auto-detection",
                    authority
                ),
            }
        }

        let uri = remote.ok_or(RegistryError::NoRemoteUri)?;
        let (provider, response) = self.auto_detect(input, &uri, &settings).await?;

        if response.is_some() {
            remember_provider(&settings, &uri, provider.id());
        }
        Ok(provider)
    }

    async fn auto_detect(
        &self,
        input: &InputArguments,
        uri: &Url,
        settings: &Settings,
    ) -> Result<(&dyn HostProvider, Option<ProbeResponse>), RegistryError> {
        let can_probe = matches!(
            uri.scheme().to_ascii_lowercase().as_str(),
            "http" | "https"
        );
        let timeout_ms = settings.auto_detect_timeout_ms();
        let mut probed = false;
        let mut response: Option<ProbeResponse> = None;

        for (priority, bucket) in self.providers.iter().rev() {
            log::debug!("auto-detecting host provider at {} priority", priority);

            if let Some(provider) = bucket.iter().find(|p| p.is_supported(input)) {
                return Ok((provider.as_ref(), response));
            }

            if can_probe && timeout_ms > 0 && !probed {
                probed = true;
                response = self.probe(uri, timeout_ms).await;
            }

            if let Some(provider) = bucket
                .iter()
                .find(|p| p.is_supported_response(response.as_ref()))
            {
                return Ok((provider.as_ref(), response));
            }
        }

        Err(RegistryError::NoProvider)
    }

    async fn probe(&self, uri: &Url, timeout_ms: i64) -> Option<ProbeResponse> {
        let timeout = Duration::from_millis(timeout_ms.unsigned_abs());
        match tokio::time::timeout(timeout, self.prober.probe(uri)).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                log::warn!("failed to probe '{}' to detect provider: {}", uri, e);
                None
            }
            Err(_) => {
                log::warn!(
                    "auto-detection of host provider took too long (>{}ms); \
                     consider setting `{}.{}` to a larger value",
                    timeout_ms,
                    keys::SECTION,
                    keys::AUTODETECT_TIMEOUT
                );
                None
            }
        }
    }

    /// Dispose every provider and empty the registry.
    pub fn dispose(&mut self) {
        for provider in self.providers.values().flatten() {
            provider.dispose();
        }
        self.providers.clear();
    }
}

impl Drop for HostProviderRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Record the detected provider so the next lookup for this remote hits
/// the override instead of probing.
fn remember_provider(settings: &Settings, uri: &Url, provider_id: &str) {
    // Most specific lookup scope, so the next resolution reads it back
    let Some(scope) = configuration_scopes(uri).into_iter().next() else {
        return;
    };
    let name = format!("{}.{}.{}", keys::SECTION, scope, keys::PROVIDER);
    log::debug!("remembering host provider '{}' in '{}'", provider_id, name);

    if let Err(e) = settings.git().set(ConfigLevel::Global, &name, provider_id) {
        log::warn!(
            "failed to set host provider for '{}': {}\n\
             Run `git config --global {} {}` to set it manually.",
            uri,
            e,
            name,
            provider_id
        );
    }
}
