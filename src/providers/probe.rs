//! providers::probe
//!
//! The HTTP probe used for host provider auto-detection.
//!
//! The probe is a single unauthenticated `HEAD` request to the remote URI.
//! Any HTTP status counts as a response; only transport failures are
//! errors. Callers bound the probe with their own timeout.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::traits::ProbeResponse;

/// Errors from the auto-detection probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid proxy '{proxy}': {message}")]
    InvalidProxy { proxy: String, message: String },

    #[error("cannot build HTTP client: {0}")]
    Client(String),

    #[error("{0}")]
    Request(String),
}

/// Sends the auto-detection probe.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, uri: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Probe over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    /// Build a prober, routing through `proxy` when given.
    pub fn new(proxy: Option<&str>) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("gcred/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none());

        if let Some(proxy) = proxy.map(str::trim).filter(|p| !p.is_empty()) {
            let proxy_url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("http://{}", proxy)
            };
            let proxy_config =
                reqwest::Proxy::all(&proxy_url).map_err(|e| ProbeError::InvalidProxy {
                    proxy: proxy.to_string(),
                    message: e.to_string(),
                })?;
            builder = builder.proxy(proxy_config);
        }

        let client = builder
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, uri: &Url) -> Result<ProbeResponse, ProbeError> {
        log::debug!("probing '{}' for host provider detection", uri);
        let response = self
            .client
            .head(uri.clone())
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        log::debug!("probe of '{}' returned {}", uri, response.status());
        Ok(ProbeResponse::new(
            response.status().as_u16(),
            response.headers().clone(),
        ))
    }
}
