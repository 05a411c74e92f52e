//! providers::mock
//!
//! Configurable host provider and probe doubles for deterministic testing.
//!
//! # Example
//!
//! ```
//! use gcred::providers::mock::MockProvider;
//! use gcred::providers::HostProvider;
//! use gcred::core::input::InputArguments;
//!
//! let provider = MockProvider::new("example").matching_host("example.com");
//! let input = InputArguments::from_pairs([("protocol", "https"), ("host", "example.com")]);
//! assert!(provider.is_supported(&input));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::probe::{ProbeError, Prober};
use super::traits::{HostProvider, ProbeResponse, ProviderError};
use crate::core::credential::Credential;
use crate::core::input::InputArguments;

#[derive(Debug, Clone)]
enum StaticMatch {
    Never,
    Always,
    Host(String),
}

#[derive(Debug, Clone)]
enum ResponseMatch {
    Never,
    AnyIncludingNone,
    Header(String),
}

/// Host provider whose detection rules are set by the test.
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    authorities: Vec<String>,
    static_match: StaticMatch,
    response_match: ResponseMatch,
    credential: Credential,
    disposed: Arc<AtomicUsize>,
}

impl MockProvider {
    /// A provider that matches nothing.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            authorities: Vec::new(),
            static_match: StaticMatch::Never,
            response_match: ResponseMatch::Never,
            credential: Credential::new("mock-user", "mock-password"),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_authorities(mut self, ids: &[&str]) -> Self {
        self.authorities = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Match every request statically.
    pub fn matching_statically(mut self) -> Self {
        self.static_match = StaticMatch::Always;
        self
    }

    /// Match requests for one host (case-insensitive) statically.
    pub fn matching_host(mut self, host: &str) -> Self {
        self.static_match = StaticMatch::Host(host.to_string());
        self
    }

    /// Match probe responses carrying a header.
    pub fn matching_header(mut self, name: &str) -> Self {
        self.response_match = ResponseMatch::Header(name.to_string());
        self
    }

    /// Match at the response stage even when no probe response exists.
    pub fn matching_any_response(mut self) -> Self {
        self.response_match = ResponseMatch::AnyIncludingNone;
        self
    }

    /// Credential returned by `generate_credential`.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Counter incremented on every `dispose` call.
    pub fn dispose_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.disposed)
    }
}

#[async_trait]
impl HostProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock"
    }

    fn supported_authority_ids(&self) -> Vec<String> {
        self.authorities.clone()
    }

    fn is_supported(&self, input: &InputArguments) -> bool {
        match &self.static_match {
            StaticMatch::Never => false,
            StaticMatch::Always => true,
            StaticMatch::Host(host) => input
                .host_and_port()
                .map_or(false, |(h, _)| h.eq_ignore_ascii_case(host)),
        }
    }

    fn is_supported_response(&self, response: Option<&ProbeResponse>) -> bool {
        match &self.response_match {
            ResponseMatch::Never => false,
            ResponseMatch::AnyIncludingNone => true,
            ResponseMatch::Header(name) => response.map_or(false, |r| r.has_header(name)),
        }
    }

    async fn generate_credential(
        &self,
        _input: &InputArguments,
    ) -> Result<Credential, ProviderError> {
        Ok(self.credential.clone())
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Probe double that counts calls.
#[derive(Debug)]
pub struct MockProber {
    response: Option<(u16, Vec<(String, String)>)>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProber {
    /// Every probe fails as if the host were unreachable.
    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            response: None,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Every probe answers with `status` and `headers`.
    pub fn responding(status: u16, headers: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            response: Some((
                status,
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Wait before answering. Must be called before the prober is shared.
    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response: self.response.clone(),
            delay: Some(delay),
            calls: AtomicUsize::new(self.calls.load(Ordering::SeqCst)),
        })
    }

    /// Number of probes started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn probe(&self, uri: &Url) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.response {
            Some((status, headers)) => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    let name = HeaderName::from_bytes(name.as_bytes())
                        .map_err(|e| ProbeError::Request(e.to_string()))?;
                    let value = HeaderValue::from_str(value)
                        .map_err(|e| ProbeError::Request(e.to_string()))?;
                    map.append(name, value);
                }
                Ok(ProbeResponse::new(*status, map))
            }
            None => Err(ProbeError::Request(format!(
                "error sending request for url ({}): connection refused",
                uri
            ))),
        }
    }
}
